//! Polling connectivity monitor
//!
//! Issues a `HEAD` request against a health URL at a fixed interval. Any HTTP
//! response counts as connected, since the network path to the backend works
//! even when the backend itself answers with an error; transport failures
//! count as disconnected.
//!
//! The probe task has an explicit lifecycle: [`ProbeConnectivityMonitor::start`]
//! spawns it, [`ProbeConnectivityMonitor::stop`] cancels and joins it, and
//! dropping the monitor cancels it.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::{Client, Method};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use waypoint_core::ConnectivityMonitor;

use crate::errors::{InfraError, InfraResult};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

struct ProbeTask {
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

/// [`ConnectivityMonitor`] that polls a health endpoint.
pub struct ProbeConnectivityMonitor {
    client: Client,
    url: reqwest::Url,
    interval: Duration,
    tx: watch::Sender<bool>,
    task: Mutex<Option<ProbeTask>>,
}

impl ProbeConnectivityMonitor {
    /// The monitor reports connected until the first probe says otherwise.
    pub fn new(url: &str, interval: Duration) -> InfraResult<Self> {
        let url = reqwest::Url::parse(url).map_err(|err| InfraError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let timeout = interval.clamp(Duration::from_millis(100), Duration::from_secs(10));
        let client = Client::builder().timeout(timeout).no_proxy().build()?;
        let (tx, _) = watch::channel(true);

        Ok(Self { client, url, interval, tx, task: Mutex::new(None) })
    }

    /// Spawn the probe loop. Calling `start` on a running monitor is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return;
        }

        let cancellation = CancellationToken::new();
        let handle = tokio::spawn(probe_loop(
            self.client.clone(),
            self.url.clone(),
            self.interval,
            self.tx.clone(),
            cancellation.clone(),
        ));
        *task = Some(ProbeTask { cancellation, handle });
        info!(
            url = %self.url,
            interval_ms = self.interval.as_millis(),
            "Connectivity probe started"
        );
    }

    /// Cancel the probe loop and wait for it to exit.
    pub async fn stop(&self) -> Result<(), String> {
        let Some(task) = self.task.lock().take() else {
            return Ok(());
        };

        task.cancellation.cancel();
        match tokio::time::timeout(JOIN_TIMEOUT, task.handle).await {
            Ok(Ok(())) => {
                debug!("Connectivity probe stopped");
                Ok(())
            }
            Ok(Err(err)) => Err(format!("Probe task failed: {err}")),
            Err(_) => {
                warn!("Connectivity probe did not stop within timeout");
                Err("Probe task timeout".to_string())
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|task| !task.handle.is_finished())
    }

    /// Run one probe immediately and publish the result.
    pub async fn check_now(&self) -> bool {
        let connected = probe(&self.client, &self.url).await;
        publish(&self.tx, connected);
        connected
    }
}

impl ConnectivityMonitor for ProbeConnectivityMonitor {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Drop for ProbeConnectivityMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancellation.cancel();
        }
    }
}

async fn probe(client: &Client, url: &reqwest::Url) -> bool {
    match client.request(Method::HEAD, url.clone()).send().await {
        Ok(response) => {
            debug!(status = %response.status(), "Connectivity probe answered");
            true
        }
        Err(err) => {
            debug!(error = %err, "Connectivity probe failed");
            false
        }
    }
}

fn publish(tx: &watch::Sender<bool>, connected: bool) {
    let changed = tx.send_if_modified(|current| {
        let changed = *current != connected;
        *current = connected;
        changed
    });
    if changed {
        info!(connected, "Connectivity changed");
    }
}

async fn probe_loop(
    client: Client,
    url: reqwest::Url,
    interval: Duration,
    tx: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let connected = tokio::select! {
                    () = cancel.cancelled() => break,
                    connected = probe(&client, &url) => connected,
                };
                publish(&tx, connected);
            }
        }
    }
}
