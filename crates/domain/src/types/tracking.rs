//! Tracking lifecycle state and the consumer-facing snapshot

use serde::{Deserialize, Serialize};

use crate::errors::LocationError;
use crate::types::location::Coordinate;

/// Lifecycle of the sampling engine.
///
/// `Uninitialized → Initializing → Active ⇄ Suspended`, with
/// `Initializing → Failed` on capability errors. `Failed` only leaves through
/// a fresh initialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TrackingState {
    #[default]
    Uninitialized,
    Initializing,
    Active,
    Suspended,
    Failed(LocationError),
}

impl TrackingState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether a successful `initialize` has run since the last failure.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Initializing | Self::Active | Self::Suspended)
    }
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Read-only view of the engine exposed to the rest of the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub state: TrackingState,
    pub current_location: Option<Coordinate>,
    pub last_dispatched: Option<Coordinate>,
    pub is_tracking: bool,
    pub last_error: Option<String>,
}
