//! Offline-resilient delivery of network operations

pub mod connectivity;
pub mod ports;
pub mod queue;

pub use connectivity::ConnectivityListener;
pub use ports::{ConnectivityMonitor, KeyValueStore, OperationDispatcher};
pub use queue::{
    DiscardReason, DrainOutcome, DrainReport, DrainSkip, PersistentRequestQueue, QueueEvent,
    QueueSettings, SubmitOutcome,
};
