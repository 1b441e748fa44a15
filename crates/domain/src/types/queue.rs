//! Deferred network operations held by the offline queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::constants::LOCATION_ENDPOINT;
use crate::impl_wire_name;
use crate::types::location::Coordinate;

/// What a queued operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    LocationUpdate,
    DeliveryStatus,
    Generic,
}

impl_wire_name!(OperationKind {
    LocationUpdate => "location_update",
    DeliveryStatus => "delivery_status",
    Generic => "generic",
});

/// HTTP verb of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl_wire_name!(HttpMethod {
    Get => "get",
    Post => "post",
    Put => "put",
    Patch => "patch",
    Delete => "delete",
});

/// A network call that could not complete synchronously.
///
/// `attempt` counts failed dispatches and never decreases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOperation {
    /// UUID v4, unique within the queue
    pub id: String,
    /// What the operation does
    pub kind: OperationKind,
    /// Path relative to the API base url
    pub endpoint: String,
    /// HTTP method used on dispatch
    pub method: HttpMethod,
    /// JSON request body
    pub payload: serde_json::Value,
    /// When the operation was created
    pub enqueued_at: DateTime<Utc>,
    /// Failed dispatches so far
    #[serde(default)]
    pub attempt: u32,
}

impl QueuedOperation {
    pub fn new(
        kind: OperationKind,
        endpoint: impl Into<String>,
        method: HttpMethod,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            endpoint: endpoint.into(),
            method,
            payload,
            enqueued_at: Utc::now(),
            attempt: 0,
        }
    }

    /// `PATCH /riders/my/location` with `{lat, lng}`.
    pub fn location_update(coordinate: &Coordinate) -> Self {
        Self::new(
            OperationKind::LocationUpdate,
            LOCATION_ENDPOINT,
            HttpMethod::Patch,
            json!({ "lat": coordinate.latitude, "lng": coordinate.longitude }),
        )
    }

    /// Record one more failed dispatch.
    pub fn record_failure(&mut self) -> u32 {
        self.attempt = self.attempt.saturating_add(1);
        self.attempt
    }

    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        self.attempt >= max_retries
    }
}

/// Read-only introspection of the offline queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub queue_size: usize,
    pub is_online: bool,
    pub is_processing: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn location_update_targets_rider_endpoint() {
        let op = QueuedOperation::location_update(&Coordinate::new(40.0, -73.5));

        assert_eq!(op.kind, OperationKind::LocationUpdate);
        assert_eq!(op.method, HttpMethod::Patch);
        assert_eq!(op.endpoint, "/riders/my/location");
        assert_eq!(op.payload, json!({ "lat": 40.0, "lng": -73.5 }));
        assert_eq!(op.attempt, 0);
    }

    #[test]
    fn failures_saturate_and_exhaust() {
        let mut op = QueuedOperation::new(
            OperationKind::Generic,
            "/ping",
            HttpMethod::Post,
            serde_json::Value::Null,
        );
        assert!(!op.is_exhausted(3));
        op.record_failure();
        op.record_failure();
        assert_eq!(op.record_failure(), 3);
        assert!(op.is_exhausted(3));
    }

    #[test]
    fn kind_and_method_parse_case_insensitively() {
        assert_eq!(
            OperationKind::from_str("Delivery_Status").unwrap(),
            OperationKind::DeliveryStatus
        );
        assert_eq!(HttpMethod::from_str("PATCH").unwrap(), HttpMethod::Patch);
        assert_eq!(HttpMethod::Delete.to_string(), "delete");
    }

    #[test]
    fn stored_form_is_camel_case_and_tolerates_missing_attempt() {
        let raw = r#"{
            "id": "op-1",
            "kind": "delivery_status",
            "endpoint": "/deliveries/42/status",
            "method": "PUT",
            "payload": {"status": "delivered"},
            "enqueuedAt": "2025-03-01T12:00:00Z"
        }"#;
        let op: QueuedOperation = serde_json::from_str(raw).unwrap();
        assert_eq!(op.attempt, 0);
        assert_eq!(op.method, HttpMethod::Put);
    }
}
