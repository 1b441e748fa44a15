//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Offline queue
/// Pending operations kept before the oldest is evicted
pub const MAX_QUEUE_SIZE: usize = 100;
/// Failed attempts after which a queued operation is discarded
pub const MAX_RETRIES: u32 = 3;
/// Storage key of the persisted queue
pub const QUEUE_STORAGE_KEY: &str = "waypoint.offline_queue";

// Tracking defaults
/// Time floor between dispatches
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 30_000;
/// Movement that triggers a dispatch before the time floor
pub const DEFAULT_MIN_DISTANCE_METERS: f64 = 50.0;

// Geodesy
/// Mean Earth radius for haversine distances
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// Backend
/// Rider location update endpoint
pub const LOCATION_ENDPOINT: &str = "/riders/my/location";
/// Per-request HTTP timeout
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
/// Seconds between connectivity probes
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;
