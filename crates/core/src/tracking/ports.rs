//! Port interfaces for position sampling
//!
//! These traits define the boundaries between core business logic
//! and platform location services.

use async_trait::async_trait;
use tokio::sync::mpsc;
use waypoint_domain::{Accuracy, Coordinate, LocationError, PermissionStatus, WatchOptions};

/// Samples delivered by a watch subscription.
///
/// Dropping the receiver ends the subscription; sources stop producing once
/// their sender reports the channel closed.
pub type SampleStream = mpsc::Receiver<Coordinate>;

/// Trait for the device positioning capability
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Ask for permission to sample while the app is in the foreground
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, LocationError>;

    /// Ask for permission to keep sampling in the background
    async fn request_background_permission(&self) -> Result<PermissionStatus, LocationError>;

    /// Take a single sample
    async fn current_position(&self, accuracy: Accuracy) -> Result<Coordinate, LocationError>;

    /// Open a continuous sampling subscription
    async fn watch_position(&self, options: WatchOptions) -> Result<SampleStream, LocationError>;
}
