//! Connectivity listener
//!
//! Bridges a [`ConnectivityMonitor`] to a [`PersistentRequestQueue`]: keeps
//! the queue's online flag current and triggers a drain on every
//! offline→online transition.
//!
//! The listener owns its task. Cancellation is explicit through
//! [`ConnectivityListener::shutdown`], and dropping a running listener
//! cancels the task as well.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ports::ConnectivityMonitor;
use super::queue::{DrainOutcome, PersistentRequestQueue};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Background task forwarding connectivity changes to the offline queue.
pub struct ConnectivityListener {
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl ConnectivityListener {
    /// Seed the queue from the monitor's current state and start listening.
    ///
    /// When the device is online and the queue holds a restored backlog, one
    /// drain is started right away.
    pub fn spawn(
        monitor: Arc<dyn ConnectivityMonitor>,
        queue: Arc<PersistentRequestQueue>,
    ) -> Self {
        let changes = monitor.subscribe();
        let online = monitor.is_connected();
        queue.set_online(online);
        info!(online, queued = queue.len(), "Connectivity listener started");

        if online && !queue.is_empty() {
            spawn_drain(Arc::clone(&queue));
        }

        let cancellation = CancellationToken::new();
        let task_handle = tokio::spawn(listen(changes, queue, cancellation.clone()));

        Self { cancellation, task_handle: Some(task_handle) }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Cancel the task and wait for it to exit.
    pub async fn shutdown(&mut self) -> Result<(), String> {
        self.cancellation.cancel();

        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
            Ok(Ok(())) => {
                debug!("Connectivity listener stopped");
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Connectivity listener task failed");
                Err(format!("Listener task failed: {err}"))
            }
            Err(_) => {
                warn!("Connectivity listener did not stop within timeout");
                Err("Listener task timeout".to_string())
            }
        }
    }
}

impl Drop for ConnectivityListener {
    fn drop(&mut self) {
        if self.task_handle.is_some() {
            self.cancellation.cancel();
        }
    }
}

async fn listen(
    mut changes: watch::Receiver<bool>,
    queue: Arc<PersistentRequestQueue>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Connectivity listener cancelled");
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    warn!("Connectivity monitor went away; listener exiting");
                    break;
                }

                let online = *changes.borrow_and_update();
                if queue.set_online(online) {
                    spawn_drain(Arc::clone(&queue));
                }
            }
        }
    }
}

fn spawn_drain(queue: Arc<PersistentRequestQueue>) {
    tokio::spawn(async move {
        if let DrainOutcome::Skipped(reason) = queue.drain().await {
            debug!(?reason, "Reconnect drain skipped");
        }
    });
}
