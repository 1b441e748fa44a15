//! Shared test helpers for `waypoint-core` integration tests.
//!
//! Lightweight mocks for every port so that engine and queue tests can focus
//! on behaviour instead of boilerplate.

#![allow(dead_code)]

pub mod network;
pub mod position;

use std::sync::{Arc, Once};

use tracing_subscriber::EnvFilter;
use waypoint_core::{
    Clock, ManualClock, PersistentRequestQueue, QueueSettings, SyncEngine, SystemClock,
};
use waypoint_domain::TrackingConfig;

pub use network::{MemoryStore, RecordingDispatcher, SignalMonitor};
pub use position::MockPositionSource;

/// Everything an engine test needs, wired together.
///
/// `clock` drives the engine only for harnesses built by [`Harness::new`] or
/// [`Harness::with_dispatcher`]; [`Harness::on_tokio_time`] engines follow
/// tokio's (usually paused) timer instead.
pub struct Harness {
    pub engine: Arc<SyncEngine>,
    pub queue: Arc<PersistentRequestQueue>,
    pub source: Arc<MockPositionSource>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub store: Arc<MemoryStore>,
    pub clock: ManualClock,
}

impl Harness {
    pub async fn new(config: TrackingConfig) -> Self {
        Self::with_dispatcher(config, RecordingDispatcher::default()).await
    }

    pub async fn with_dispatcher(config: TrackingConfig, dispatcher: RecordingDispatcher) -> Self {
        let clock = ManualClock::new();
        Self::assemble(config, dispatcher, clock.clone(), Arc::new(clock)).await
    }

    /// Engine whose throttle and heartbeat both read tokio's timer.
    pub async fn on_tokio_time(config: TrackingConfig) -> Self {
        let dispatcher = RecordingDispatcher::default();
        Self::assemble(config, dispatcher, ManualClock::new(), Arc::new(SystemClock)).await
    }

    async fn assemble(
        config: TrackingConfig,
        dispatcher: RecordingDispatcher,
        clock: ManualClock,
        engine_clock: Arc<dyn Clock>,
    ) -> Self {
        init_test_logging();
        let source = Arc::new(MockPositionSource::default());
        let dispatcher = Arc::new(dispatcher);
        let store = Arc::new(MemoryStore::default());

        let queue = Arc::new(
            PersistentRequestQueue::restore(
                store.clone(),
                dispatcher.clone(),
                QueueSettings::default(),
            )
            .await,
        );
        let engine = Arc::new(SyncEngine::new(
            source.clone(),
            queue.clone(),
            engine_clock,
            config,
        ));

        Self { engine, queue, source, dispatcher, store, clock }
    }
}

/// Tracking config with explicit thresholds.
pub fn config(min_interval_ms: u64, min_distance_meters: f64) -> TrackingConfig {
    TrackingConfig { min_interval_ms, min_distance_meters, ..TrackingConfig::default() }
}

/// Route engine logs through the test harness; `RUST_LOG` selects the level.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
