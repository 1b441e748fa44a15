//! Rider backend adapter
//!
//! Sends queued operations to the delivery backend. Location updates go to
//! `PATCH {base_url}/riders/my/location` with a `{lat, lng}` body; any other
//! operation is sent to its own endpoint with its payload as JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, instrument};
use waypoint_core::OperationDispatcher;
use waypoint_domain::{ApiConfig, DispatchError, HttpMethod, QueuedOperation};

use super::client::HttpClient;
use crate::errors::{InfraError, InfraResult, IntoDispatchError};

const USER_AGENT: &str = concat!("waypoint/", env!("CARGO_PKG_VERSION"));

/// [`OperationDispatcher`] backed by the rider HTTP API.
#[derive(Clone)]
pub struct RiderApiClient {
    http: HttpClient,
    base_url: String,
}

impl RiderApiClient {
    pub fn new(http: HttpClient, base_url: impl Into<String>) -> InfraResult<Self> {
        let base_url = base_url.into();
        reqwest::Url::parse(&base_url).map_err(|err| InfraError::InvalidUrl {
            url: base_url.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Build a client from the `[api]` config section.
    pub fn from_config(config: &ApiConfig) -> InfraResult<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .bearer_token(config.auth_token.clone())
            .build()?;
        Self::new(http, config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl OperationDispatcher for RiderApiClient {
    #[instrument(skip_all, fields(operation_id = %operation.id, kind = %operation.kind))]
    async fn dispatch(&self, operation: &QueuedOperation) -> Result<(), DispatchError> {
        let url = self.url_for(&operation.endpoint);
        let mut request = self.http.request(to_method(operation.method), url);
        if operation.method != HttpMethod::Get && !operation.payload.is_null() {
            request = request.json(&operation.payload);
        }

        let response = self.http.send(request).await?;
        let status = response.status();
        if status.is_success() {
            debug!(%status, "Operation accepted");
            Ok(())
        } else {
            Err(status.into_dispatch())
        }
    }
}
