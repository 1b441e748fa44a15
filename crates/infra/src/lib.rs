//! # Waypoint Infrastructure
//!
//! Infrastructure adapters for the ports defined in `waypoint-core`.
//!
//! This crate contains:
//! - HTTP dispatcher for the rider backend (reqwest)
//! - File and in-memory key-value stores for the offline queue
//! - Connectivity monitors (host-signalled and HTTP probe)
//! - A replaying position source
//! - Configuration loading and tracing setup
//! - The composition root wiring everything together

pub mod config;
pub mod connectivity;
pub mod errors;
pub mod http;
pub mod observability;
pub mod position;
pub mod runtime;
pub mod storage;

pub use connectivity::{ProbeConnectivityMonitor, SignalConnectivityMonitor};
pub use errors::{InfraError, InfraResult};
pub use http::{HttpClient, RiderApiClient};
pub use position::ReplayPositionSource;
pub use runtime::{Connectivity, WaypointRuntime};
pub use storage::{FileKeyValueStore, MemoryKeyValueStore};
