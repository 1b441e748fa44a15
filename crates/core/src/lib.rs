//! # Waypoint Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for position, storage, connectivity
//!   and network dispatch
//! - The sample filter and throttle policy
//! - The persistent offline request queue
//! - The sync engine state machine and its consumer facade
//!
//! ## Architecture Principles
//! - Only depends on `waypoint-domain`
//! - No filesystem, HTTP, or platform code
//! - All external dependencies via traits
//! - Time-dependent behaviour driven through an injectable [`time::Clock`]

pub mod sync;
pub mod time;
pub mod tracking;

// Re-export specific items to avoid ambiguity
pub use sync::ports::{ConnectivityMonitor, KeyValueStore, OperationDispatcher};
pub use sync::{
    ConnectivityListener, DiscardReason, DrainOutcome, DrainReport, DrainSkip,
    PersistentRequestQueue, QueueEvent, QueueSettings, SubmitOutcome,
};
pub use time::{Clock, ManualClock, SystemClock};
pub use tracking::ports::{PositionSource, SampleStream};
pub use tracking::{
    haversine_distance, DispatchDecision, DispatchMark, LocationHandle, SyncEngine,
    ThrottlePolicy,
};
