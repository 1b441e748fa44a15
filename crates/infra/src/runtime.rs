//! Composition root
//!
//! Wires the adapters in this crate to the engine and queue from
//! `waypoint-core`. One [`WaypointRuntime`] is built per process and handed
//! to whoever needs tracking; nothing here is global.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use waypoint_core::{
    ConnectivityListener, ConnectivityMonitor, KeyValueStore, LocationHandle,
    PersistentRequestQueue, PositionSource, QueueSettings, SyncEngine, SystemClock,
};
use waypoint_domain::AppConfig;

use crate::connectivity::{ProbeConnectivityMonitor, SignalConnectivityMonitor};
use crate::errors::InfraResult;
use crate::http::RiderApiClient;
use crate::storage::{FileKeyValueStore, MemoryKeyValueStore};

/// Where connectivity information comes from.
#[derive(Clone)]
pub enum Connectivity {
    /// Pushed by the host through [`SignalConnectivityMonitor::set_connected`]
    Signal(Arc<SignalConnectivityMonitor>),
    /// Polled from a health URL
    Probe(Arc<ProbeConnectivityMonitor>),
}

impl Connectivity {
    pub fn monitor(&self) -> Arc<dyn ConnectivityMonitor> {
        match self {
            Self::Signal(monitor) => monitor.clone(),
            Self::Probe(monitor) => monitor.clone(),
        }
    }
}

/// Fully wired tracking stack.
pub struct WaypointRuntime {
    engine: Arc<SyncEngine>,
    queue: Arc<PersistentRequestQueue>,
    connectivity: Connectivity,
    listener: ConnectivityListener,
}

impl WaypointRuntime {
    /// Build every component from `config` around the given position source.
    ///
    /// Restores the persisted queue and starts listening for connectivity,
    /// but does not start tracking.
    pub async fn build(
        config: &AppConfig,
        position_source: Arc<dyn PositionSource>,
    ) -> InfraResult<Self> {
        config.validate()?;

        let store: Arc<dyn KeyValueStore> = if config.queue.storage_dir.is_empty() {
            warn!("No storage directory configured; offline queue will not survive restarts");
            Arc::new(MemoryKeyValueStore::new())
        } else {
            Arc::new(FileKeyValueStore::new(&config.queue.storage_dir))
        };

        let dispatcher = Arc::new(RiderApiClient::from_config(&config.api)?);
        let queue = Arc::new(
            PersistentRequestQueue::restore(store, dispatcher, QueueSettings::from(&config.queue))
                .await,
        );

        let engine = Arc::new(SyncEngine::new(
            position_source,
            queue.clone(),
            Arc::new(SystemClock),
            config.tracking.clone(),
        ));

        let connectivity = match &config.connectivity.probe_url {
            Some(url) => {
                let interval = Duration::from_secs(config.connectivity.probe_interval_secs);
                let probe = Arc::new(ProbeConnectivityMonitor::new(url, interval)?);
                probe.check_now().await;
                probe.start();
                Connectivity::Probe(probe)
            }
            None => Connectivity::Signal(Arc::new(SignalConnectivityMonitor::new(true))),
        };

        let listener = ConnectivityListener::spawn(connectivity.monitor(), queue.clone());

        info!(
            base_url = %config.api.base_url,
            queued = queue.len(),
            online = queue.is_online(),
            "Waypoint runtime ready"
        );

        Ok(Self { engine, queue, connectivity, listener })
    }

    pub fn handle(&self) -> LocationHandle {
        LocationHandle::new(self.engine.clone())
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub fn queue(&self) -> &Arc<PersistentRequestQueue> {
        &self.queue
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Stop sampling, the connectivity listener and any probe task.
    pub async fn shutdown(mut self) {
        self.engine.shutdown().await;

        if let Err(err) = self.listener.shutdown().await {
            warn!(error = %err, "Connectivity listener shutdown failed");
        }

        if let Connectivity::Probe(probe) = &self.connectivity {
            if let Err(err) = probe.stop().await {
                warn!(error = %err, "Connectivity probe shutdown failed");
            }
        }

        info!(queued = self.queue.len(), "Waypoint runtime stopped");
    }
}
