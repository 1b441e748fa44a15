//! Consumer-facing handle over the sync engine

use std::sync::Arc;

use tokio::sync::watch;
use waypoint_domain::{Coordinate, TrackingConfigPatch, TrackingSnapshot, TrackingState};

use super::service::SyncEngine;

/// Cheap, cloneable view of the tracking engine for UI and other consumers.
///
/// Reads come from the latest published [`TrackingSnapshot`]; commands are
/// forwarded to the shared [`SyncEngine`].
#[derive(Clone)]
pub struct LocationHandle {
    engine: Arc<SyncEngine>,
    snapshots: watch::Receiver<TrackingSnapshot>,
}

impl LocationHandle {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        let snapshots = engine.subscribe();
        Self { engine, snapshots }
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn current_location(&self) -> Option<Coordinate> {
        self.snapshots.borrow().current_location.clone()
    }

    pub fn is_tracking(&self) -> bool {
        self.snapshots.borrow().is_tracking
    }

    pub fn last_error(&self) -> Option<String> {
        self.snapshots.borrow().last_error.clone()
    }

    pub fn state(&self) -> TrackingState {
        self.snapshots.borrow().state.clone()
    }

    pub async fn start(&self) -> bool {
        self.engine.start_tracking().await
    }

    pub fn stop(&self) {
        self.engine.stop_tracking();
    }

    pub async fn get_current_location(&self) -> Option<Coordinate> {
        self.engine.get_current_location().await
    }

    pub async fn force_update(&self) -> bool {
        self.engine.force_location_update().await
    }

    pub async fn update_config(&self, patch: TrackingConfigPatch) -> bool {
        self.engine.update_config(patch).await
    }

    /// Wait for the next snapshot change and return it.
    ///
    /// Returns `None` once the engine has been dropped.
    pub async fn changed(&mut self) -> Option<TrackingSnapshot> {
        self.snapshots.changed().await.ok()?;
        Some(self.snapshots.borrow_and_update().clone())
    }
}

impl std::fmt::Debug for LocationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationHandle").field("snapshot", &*self.snapshots.borrow()).finish()
    }
}
