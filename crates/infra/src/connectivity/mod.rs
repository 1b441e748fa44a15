//! Connectivity monitor adapters

pub mod probe;
pub mod signal;

pub use probe::ProbeConnectivityMonitor;
pub use signal::SignalConnectivityMonitor;
