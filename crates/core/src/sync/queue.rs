//! Persistent offline request queue
//!
//! A bounded FIFO of network operations that could not complete
//! synchronously. Every mutation is written through to the
//! [`KeyValueStore`] before the mutating call returns, so a process restart
//! loses at most the operation currently in flight.
//!
//! ## Policies
//!
//! - **Capacity**: enqueueing into a full queue evicts the oldest entry.
//! - **Retries**: every failed dispatch increments `attempt`, whatever the
//!   error; once `attempt` reaches `max_retries` the entry is discarded.
//! - **Drain**: single-flight. A drain requested while another is running is
//!   dropped, not queued.
//! - **Storage failures**: logged; the queue keeps operating in memory.
//!
//! Evictions and discards are not retried or dead-lettered. They are logged
//! and published as [`QueueEvent`]s for hosts that want to observe losses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use waypoint_domain::constants::{MAX_QUEUE_SIZE, MAX_RETRIES, QUEUE_STORAGE_KEY};
use waypoint_domain::{
    DispatchError, OperationKind, QueueConfig, QueueStatus, QueuedOperation, StorageResult,
};

use super::ports::{KeyValueStore, OperationDispatcher};

/// Persistence format version
const PERSISTENCE_VERSION: u32 = 1;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Queue limits and storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Capacity; enqueueing beyond it evicts the oldest entry
    pub max_queue_size: usize,
    /// Failed attempts after which an entry is discarded
    pub max_retries: u32,
    /// Key the queue is persisted under
    pub storage_key: String,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_queue_size: MAX_QUEUE_SIZE,
            max_retries: MAX_RETRIES,
            storage_key: QUEUE_STORAGE_KEY.to_string(),
        }
    }
}

impl From<&QueueConfig> for QueueSettings {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_queue_size: config.max_queue_size,
            max_retries: config.max_retries,
            storage_key: config.storage_key.clone(),
        }
    }
}

/// Stored form of the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedQueue {
    version: u32,
    saved_at: DateTime<Utc>,
    operations: Vec<QueuedOperation>,
}

/// Why an operation left the queue without being delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// `attempt` reached `max_retries`; carries the last dispatch error
    RetriesExhausted(DispatchError),
}

/// Observable queue activity.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// An operation was appended
    Enqueued {
        /// Operation id
        id: String,
        /// Operation kind
        kind: OperationKind,
    },
    /// The queue was full and its oldest entry was dropped
    Evicted(QueuedOperation),
    /// A queued operation reached the backend and left the queue
    Delivered {
        /// Operation id
        id: String,
    },
    /// A queued operation failed and stays for the next drain
    Retained {
        /// Operation id
        id: String,
        /// Failed attempts so far
        attempt: u32,
    },
    /// A queued operation was dropped without being delivered
    Discarded {
        /// The dropped operation, with its final `attempt`
        operation: QueuedOperation,
        /// Why it was dropped
        reason: DiscardReason,
    },
    /// A drain began with `pending` operations to attempt
    DrainStarted {
        /// Operations present when the drain started
        pending: usize,
    },
    /// A drain ran to completion or was interrupted
    DrainFinished(DrainReport),
}

/// Result of [`PersistentRequestQueue::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The backend accepted the operation
    Delivered,
    /// The operation is waiting in the queue for the next drain
    Queued,
    /// The dispatch failed after its cancellation token fired; nothing was queued
    Discarded,
}

/// Why a drain did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainSkip {
    /// Another drain holds the processing flag
    AlreadyProcessing,
    /// The queue is marked offline
    Offline,
    /// Nothing is pending
    Empty,
}

/// Per-drain counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Dispatches made
    pub attempted: usize,
    /// Operations the backend accepted
    pub delivered: usize,
    /// Failed operations kept for another attempt
    pub retained: usize,
    /// Failed operations that ran out of attempts
    pub discarded: usize,
    /// Connectivity dropped before every pending operation was attempted
    pub interrupted: bool,
}

/// Result of [`PersistentRequestQueue::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The drain did not run
    Skipped(DrainSkip),
    /// The drain ran; counters describe what happened
    Completed(DrainReport),
}

enum FailureOutcome {
    Retained(u32),
    Discarded(QueuedOperation, DiscardReason),
    Missing,
}

/// Resets the processing flag when a drain ends, however it ends.
struct ProcessingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Durable, bounded FIFO of pending network operations.
pub struct PersistentRequestQueue {
    store: Arc<dyn KeyValueStore>,
    dispatcher: Arc<dyn OperationDispatcher>,
    settings: QueueSettings,
    items: Mutex<VecDeque<QueuedOperation>>,
    len: AtomicUsize,
    is_online: AtomicBool,
    is_processing: AtomicBool,
    events: broadcast::Sender<QueueEvent>,
}

impl PersistentRequestQueue {
    /// Build a queue and reload whatever a previous process left in storage.
    ///
    /// Unreadable stored data is logged and replaced by an empty queue. The
    /// queue starts online; a [`super::ConnectivityListener`] corrects that
    /// from the monitor as soon as it is attached.
    #[instrument(skip_all, fields(storage_key = %settings.storage_key))]
    pub async fn restore(
        store: Arc<dyn KeyValueStore>,
        dispatcher: Arc<dyn OperationDispatcher>,
        settings: QueueSettings,
    ) -> Self {
        let settings = QueueSettings { max_queue_size: settings.max_queue_size.max(1), ..settings };

        let mut items = match Self::load(store.as_ref(), &settings.storage_key).await {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "Failed to load persisted queue; starting empty");
                VecDeque::new()
            }
        };

        let overflow = items.len().saturating_sub(settings.max_queue_size);
        if overflow > 0 {
            warn!(overflow, "Persisted queue exceeds capacity; dropping oldest entries");
            items.drain(..overflow);
        }

        if !items.is_empty() {
            info!(count = items.len(), "Restored persisted queue");
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            store,
            dispatcher,
            len: AtomicUsize::new(items.len()),
            items: Mutex::new(items),
            settings,
            is_online: AtomicBool::new(true),
            is_processing: AtomicBool::new(false),
            events,
        }
    }

    async fn load(
        store: &dyn KeyValueStore,
        key: &str,
    ) -> StorageResult<VecDeque<QueuedOperation>> {
        let Some(raw) = store.get(key).await? else {
            debug!("No persisted queue found");
            return Ok(VecDeque::new());
        };

        let persisted: PersistedQueue = serde_json::from_str(&raw)?;
        if persisted.version != PERSISTENCE_VERSION {
            warn!(
                expected = PERSISTENCE_VERSION,
                found = persisted.version,
                "Persisted queue version mismatch"
            );
        }

        Ok(persisted.operations.into())
    }

    /// Write the current contents through to storage.
    async fn persist(&self, items: &VecDeque<QueuedOperation>) {
        let key = &self.settings.storage_key;

        let result = if items.is_empty() {
            self.store.remove(key).await
        } else {
            let persisted = PersistedQueue {
                version: PERSISTENCE_VERSION,
                saved_at: Utc::now(),
                operations: items.iter().cloned().collect(),
            };
            match serde_json::to_string(&persisted) {
                Ok(raw) => self.store.set(key, &raw).await,
                Err(err) => Err(err.into()),
            }
        };

        if let Err(err) = result {
            error!(
                error = %err,
                count = items.len(),
                "Failed to persist queue; continuing in memory"
            );
        }
    }

    fn emit(&self, event: QueueEvent) {
        // No subscribers is the common case
        let _ = self.events.send(event);
    }

    /// Append an operation, evicting the oldest entry when full.
    ///
    /// Returns the evicted operation, if any.
    #[instrument(
        skip(self, operation),
        fields(operation_id = %operation.id, kind = %operation.kind)
    )]
    pub async fn enqueue(&self, operation: QueuedOperation) -> Option<QueuedOperation> {
        let id = operation.id.clone();
        let kind = operation.kind;

        let mut items = self.items.lock().await;
        let evicted =
            if items.len() >= self.settings.max_queue_size { items.pop_front() } else { None };
        items.push_back(operation);
        self.len.store(items.len(), Ordering::Release);
        self.persist(&items).await;
        let size = items.len();
        drop(items);

        if let Some(ref oldest) = evicted {
            warn!(
                evicted_id = %oldest.id,
                evicted_kind = %oldest.kind,
                attempt = oldest.attempt,
                "Queue full; evicted oldest operation"
            );
            self.emit(QueueEvent::Evicted(oldest.clone()));
        }

        debug!(size, "Operation enqueued");
        self.emit(QueueEvent::Enqueued { id, kind });
        evicted
    }

    /// Dispatch now when online; queue when offline or when the dispatch fails.
    pub async fn submit(&self, operation: QueuedOperation) -> SubmitOutcome {
        self.submit_inner(operation, None).await
    }

    /// Like [`Self::submit`], but a failure that completes after `cancel` has
    /// fired is dropped instead of queued.
    pub async fn submit_guarded(
        &self,
        operation: QueuedOperation,
        cancel: &CancellationToken,
    ) -> SubmitOutcome {
        self.submit_inner(operation, Some(cancel)).await
    }

    #[instrument(skip_all, fields(operation_id = %operation.id, kind = %operation.kind))]
    async fn submit_inner(
        &self,
        operation: QueuedOperation,
        cancel: Option<&CancellationToken>,
    ) -> SubmitOutcome {
        if !self.is_online() {
            debug!("Offline; deferring operation");
            self.enqueue(operation).await;
            return SubmitOutcome::Queued;
        }

        match self.dispatcher.dispatch(&operation).await {
            Ok(()) => SubmitOutcome::Delivered,
            Err(err) if cancel.is_some_and(CancellationToken::is_cancelled) => {
                debug!(error = %err, "Dispatch failed after cancellation; dropping result");
                SubmitOutcome::Discarded
            }
            Err(err) => {
                warn!(
                    error = %err,
                    transient = err.is_transient(),
                    "Dispatch failed; deferring to offline queue"
                );
                self.enqueue(operation).await;
                SubmitOutcome::Queued
            }
        }
    }

    /// Flush pending operations in FIFO order, one at a time.
    ///
    /// Only operations present when the drain starts are attempted; anything
    /// enqueued meanwhile waits for the next drain.
    #[instrument(skip(self))]
    pub async fn drain(&self) -> DrainOutcome {
        let Some(_guard) = ProcessingGuard::acquire(&self.is_processing) else {
            debug!("Drain already in progress; ignoring trigger");
            return DrainOutcome::Skipped(DrainSkip::AlreadyProcessing);
        };

        if !self.is_online() {
            debug!("Offline; skipping drain");
            return DrainOutcome::Skipped(DrainSkip::Offline);
        }

        let pending: Vec<QueuedOperation> = self.items.lock().await.iter().cloned().collect();
        if pending.is_empty() {
            return DrainOutcome::Skipped(DrainSkip::Empty);
        }

        info!(pending = pending.len(), "Draining offline queue");
        self.emit(QueueEvent::DrainStarted { pending: pending.len() });

        let mut report = DrainReport::default();
        for operation in pending {
            if !self.is_online() {
                info!(attempted = report.attempted, "Connectivity lost; pausing drain");
                report.interrupted = true;
                break;
            }

            report.attempted += 1;
            match self.dispatcher.dispatch(&operation).await {
                Ok(()) => {
                    self.remove(&operation.id).await;
                    report.delivered += 1;
                    debug!(operation_id = %operation.id, "Queued operation delivered");
                    self.emit(QueueEvent::Delivered { id: operation.id });
                }
                Err(err) => match self.record_failure(&operation.id, &err).await {
                    FailureOutcome::Retained(attempt) => {
                        report.retained += 1;
                        info!(
                            operation_id = %operation.id,
                            attempt,
                            error = %err,
                            transient = err.is_transient(),
                            "Queued operation failed; will retry on next drain"
                        );
                        self.emit(QueueEvent::Retained { id: operation.id, attempt });
                    }
                    FailureOutcome::Discarded(discarded, reason) => {
                        report.discarded += 1;
                        warn!(
                            operation_id = %discarded.id,
                            kind = %discarded.kind,
                            attempt = discarded.attempt,
                            error = %err,
                            ?reason,
                            "Discarding queued operation"
                        );
                        self.emit(QueueEvent::Discarded { operation: discarded, reason });
                    }
                    FailureOutcome::Missing => {
                        debug!(operation_id = %operation.id, "Operation left the queue mid-drain");
                    }
                },
            }
        }

        info!(
            attempted = report.attempted,
            delivered = report.delivered,
            retained = report.retained,
            discarded = report.discarded,
            "Drain finished"
        );
        self.emit(QueueEvent::DrainFinished(report));
        DrainOutcome::Completed(report)
    }

    async fn remove(&self, id: &str) -> Option<QueuedOperation> {
        let mut items = self.items.lock().await;
        let index = items.iter().position(|op| op.id == id)?;
        let removed = items.remove(index);
        self.len.store(items.len(), Ordering::Release);
        self.persist(&items).await;
        removed
    }

    async fn record_failure(&self, id: &str, err: &DispatchError) -> FailureOutcome {
        let mut items = self.items.lock().await;
        let Some(index) = items.iter().position(|op| op.id == id) else {
            return FailureOutcome::Missing;
        };

        let (attempt, exhausted) = match items.get_mut(index) {
            Some(op) => {
                let attempt = op.record_failure();
                (attempt, op.is_exhausted(self.settings.max_retries))
            }
            None => return FailureOutcome::Missing,
        };

        let outcome = if exhausted {
            match items.remove(index) {
                Some(op) => {
                    FailureOutcome::Discarded(op, DiscardReason::RetriesExhausted(err.clone()))
                }
                None => FailureOutcome::Missing,
            }
        } else {
            FailureOutcome::Retained(attempt)
        };

        self.len.store(items.len(), Ordering::Release);
        self.persist(&items).await;
        outcome
    }

    /// Record a connectivity change.
    ///
    /// Returns `true` only for an offline→online transition.
    pub fn set_online(&self, online: bool) -> bool {
        let was_online = self.is_online.swap(online, Ordering::AcqRel);
        if was_online != online {
            info!(online, "Connectivity changed");
        }
        !was_online && online
    }

    /// Last connectivity state recorded by [`Self::set_online`].
    pub fn is_online(&self) -> bool {
        self.is_online.load(Ordering::Acquire)
    }

    /// Whether a drain is running.
    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::Acquire)
    }

    /// Number of pending operations.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Whether no operation is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Effective limits, capacity clamped to at least one.
    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Size, connectivity and drain flag in one read.
    pub fn get_status(&self) -> QueueStatus {
        QueueStatus {
            queue_size: self.len(),
            is_online: self.is_online(),
            is_processing: self.is_processing(),
        }
    }

    /// Copy of the pending operations in FIFO order.
    pub async fn snapshot(&self) -> Vec<QueuedOperation> {
        self.items.lock().await.iter().cloned().collect()
    }

    /// Receive [`QueueEvent`]s from now on. Slow receivers may lag.
    pub fn subscribe_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }
}
