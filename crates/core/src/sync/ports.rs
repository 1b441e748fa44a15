//! Port interfaces for sync operations

use async_trait::async_trait;
use tokio::sync::watch;
use waypoint_domain::{DispatchError, QueuedOperation, StorageResult};

/// Durable string key-value storage backing the offline queue.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written or was removed
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value; must be durable once this returns `Ok`
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete a value; removing a missing key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Source of online/offline transitions.
pub trait ConnectivityMonitor: Send + Sync {
    /// Current connectivity
    fn is_connected(&self) -> bool;

    /// Subscribe to connectivity changes; dropping the receiver unsubscribes
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Performs a single network operation against the backend.
#[async_trait]
pub trait OperationDispatcher: Send + Sync {
    /// Send the operation; `Ok` means the backend answered with a 2xx status
    async fn dispatch(&self, operation: &QueuedOperation) -> Result<(), DispatchError>;
}
