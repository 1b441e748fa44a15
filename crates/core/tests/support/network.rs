use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{watch, Notify, Semaphore};
use waypoint_core::{ConnectivityMonitor, KeyValueStore, OperationDispatcher};
use waypoint_domain::{DispatchError, QueuedOperation, StorageError, StorageResult};

/// Dispatcher that records every call and replays scripted results.
///
/// Once the script is exhausted every call succeeds. A gated dispatcher
/// blocks each call until [`RecordingDispatcher::release`] hands out a
/// permit.
#[derive(Default)]
pub struct RecordingDispatcher {
    script: Mutex<VecDeque<Result<(), DispatchError>>>,
    calls: Mutex<Vec<QueuedOperation>>,
    gate: Option<Semaphore>,
    started: Notify,
}

impl RecordingDispatcher {
    pub fn scripted(script: Vec<Result<(), DispatchError>>) -> Self {
        Self { script: Mutex::new(script.into()), ..Self::default() }
    }

    pub fn gated() -> Self {
        Self { gate: Some(Semaphore::new(0)), ..Self::default() }
    }

    pub fn push_result(&self, result: Result<(), DispatchError>) {
        self.script.lock().unwrap().push_back(result);
    }

    /// Let `permits` blocked dispatches proceed.
    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    /// Wait until a dispatch call has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn calls(&self) -> Vec<QueuedOperation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|op| op.id.clone()).collect()
    }
}

#[async_trait]
impl OperationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, operation: &QueuedOperation) -> Result<(), DispatchError> {
        self.calls.lock().unwrap().push(operation.clone());
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// In-memory key-value store with write failure injection.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<usize>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("injected write failure".into()));
        }
        *self.writes.lock().unwrap() += 1;
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        *self.writes.lock().unwrap() += 1;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Connectivity monitor driven directly by the test.
pub struct SignalMonitor {
    tx: watch::Sender<bool>,
}

impl SignalMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    pub fn set(&self, online: bool) {
        self.tx.send_replace(online);
    }
}

impl ConnectivityMonitor for SignalMonitor {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
