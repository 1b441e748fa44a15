//! Conversions from transport errors into the dispatch error taxonomy.

use reqwest::{Error as HttpError, StatusCode};
use waypoint_domain::DispatchError;

/// Explicit conversion so that mapping stays on the infrastructure side.
pub(crate) trait IntoDispatchError {
    fn into_dispatch(self) -> DispatchError;
}

impl IntoDispatchError for HttpError {
    fn into_dispatch(self) -> DispatchError {
        if self.is_timeout() {
            return DispatchError::Timeout;
        }
        if self.is_builder() {
            return DispatchError::InvalidRequest(self.to_string());
        }
        if let Some(status) = self.status() {
            return status.into_dispatch();
        }
        DispatchError::Network(self.to_string())
    }
}

impl IntoDispatchError for StatusCode {
    fn into_dispatch(self) -> DispatchError {
        DispatchError::from_status(self.as_u16())
    }
}
