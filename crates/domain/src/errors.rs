//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which permission prompt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    Foreground,
    Background,
}

impl std::fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Foreground => write!(f, "foreground"),
            Self::Background => write!(f, "background"),
        }
    }
}

/// Capability-level failures of the position source.
///
/// These are fatal to `initialize` and are surfaced synchronously to the
/// caller; the engine never retries them on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LocationError {
    #[error("Location permission denied ({scope})")]
    PermissionDenied { scope: PermissionScope },

    #[error("Location capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Position subscription closed")]
    SubscriptionClosed,
}

/// Network dispatch failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error (HTTP {status})")]
    Server { status: u16 },

    #[error("Rate limited (HTTP {status})")]
    RateLimited { status: u16 },

    #[error("Unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Request rejected (HTTP {status})")]
    Rejected { status: u16 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Dispatch cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Whether a later attempt of the same operation may succeed.
    ///
    /// Auth failures count as transient: the session layer refreshes tokens
    /// independently and a queued retry picks up the new credentials.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout
                | Self::Server { .. }
                | Self::RateLimited { .. }
                | Self::Unauthorized { .. }
        )
    }

    /// Map a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized { status },
            408 | 429 => Self::RateLimited { status },
            500..=599 => Self::Server { status },
            _ => Self::Rejected { status },
        }
    }
}

/// Durable key-value storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration loading and validation failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_common_codes() {
        assert_eq!(DispatchError::from_status(401), DispatchError::Unauthorized { status: 401 });
        assert_eq!(DispatchError::from_status(429), DispatchError::RateLimited { status: 429 });
        assert_eq!(DispatchError::from_status(503), DispatchError::Server { status: 503 });
        assert_eq!(DispatchError::from_status(422), DispatchError::Rejected { status: 422 });
    }

    #[test]
    fn transient_classification() {
        assert!(DispatchError::Network("reset".into()).is_transient());
        assert!(DispatchError::Timeout.is_transient());
        assert!(DispatchError::Server { status: 502 }.is_transient());
        assert!(!DispatchError::Rejected { status: 400 }.is_transient());
        assert!(!DispatchError::InvalidRequest("bad".into()).is_transient());
        assert!(!DispatchError::Cancelled.is_transient());
    }

    #[test]
    fn location_error_messages_name_the_scope() {
        let err = LocationError::PermissionDenied { scope: PermissionScope::Background };
        assert_eq!(err.to_string(), "Location permission denied (background)");
    }
}
