//! Location sampling, throttling and upload

pub mod facade;
pub mod filter;
pub mod ports;
pub mod service;
pub mod throttle;

pub use facade::LocationHandle;
pub use filter::haversine_distance;
pub use ports::{PositionSource, SampleStream};
pub use service::SyncEngine;
pub use throttle::{DispatchDecision, DispatchMark, ThrottlePolicy};
