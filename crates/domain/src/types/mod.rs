//! Domain types and models

pub mod location;
pub mod queue;
pub mod tracking;

pub use location::{
    Accuracy, Coordinate, PermissionStatus, TrackingConfig, TrackingConfigPatch, WatchOptions,
};
pub use queue::{HttpMethod, OperationKind, QueueStatus, QueuedOperation};
pub use tracking::{TrackingSnapshot, TrackingState};
