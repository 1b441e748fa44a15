//! Sync engine - tracking lifecycle and sample dispatch
//!
//! The engine owns the sampling state machine:
//!
//! ```text
//! Uninitialized → Initializing → Active ⇄ Suspended
//!                      │
//!                      └→ Failed(reason)   (terminal until re-initialized)
//! ```
//!
//! Samples arriving from the [`PositionSource`] subscription are filtered by
//! the [`ThrottlePolicy`]; accepted samples become `LocationUpdate`
//! operations handed to the [`PersistentRequestQueue`], which either sends
//! them now or defers them until connectivity returns.
//!
//! Bookkeeping lives behind a `parking_lot` mutex that is never held across
//! an `.await`. Every mutation publishes a fresh [`TrackingSnapshot`] on a
//! watch channel.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant as TokioInstant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use waypoint_domain::{
    Coordinate, LocationError, PermissionScope, PermissionStatus, QueuedOperation,
    TrackingConfig, TrackingConfigPatch, TrackingSnapshot, TrackingState,
};

use super::ports::{PositionSource, SampleStream};
use super::throttle::{DispatchDecision, DispatchMark, ThrottlePolicy};
use crate::sync::{PersistentRequestQueue, SubmitOutcome};
use crate::time::Clock;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A live watch subscription and the task consuming it.
struct Subscription {
    cancellation: CancellationToken,
    task: JoinHandle<()>,
    generation: u64,
}

#[derive(Default)]
struct EngineState {
    state: TrackingState,
    config: TrackingConfig,
    last_sampled: Option<Coordinate>,
    last_dispatched: Option<DispatchMark>,
    last_error: Option<String>,
    subscription: Option<Subscription>,
    next_generation: u64,
}

impl EngineState {
    fn snapshot(&self) -> TrackingSnapshot {
        TrackingSnapshot {
            state: self.state.clone(),
            current_location: self.last_sampled.clone(),
            last_dispatched: self.last_dispatched.as_ref().map(|mark| mark.coordinate.clone()),
            is_tracking: self.state.is_active(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Location tracking and upload engine.
///
/// Shared as `Arc<SyncEngine>`. Operations that spawn the sampling task take
/// `self: &Arc<Self>`; the task itself only holds a weak reference so that
/// dropping the last handle stops sampling.
pub struct SyncEngine {
    source: Arc<dyn PositionSource>,
    queue: Arc<PersistentRequestQueue>,
    clock: Arc<dyn Clock>,
    inner: Mutex<EngineState>,
    snapshot_tx: watch::Sender<TrackingSnapshot>,
}

impl SyncEngine {
    /// The heartbeat sleeps on tokio's timer while throttle decisions read
    /// `clock`. [`crate::time::SystemClock`] reads the same timer, so both
    /// stay on one timeline, paused test time included.
    pub fn new(
        source: Arc<dyn PositionSource>,
        queue: Arc<PersistentRequestQueue>,
        clock: Arc<dyn Clock>,
        config: TrackingConfig,
    ) -> Self {
        let inner = EngineState { config, ..EngineState::default() };
        let (snapshot_tx, _) = watch::channel(inner.snapshot());

        Self { source, queue, clock, inner: Mutex::new(inner), snapshot_tx }
    }

    /// Prepare the engine for sampling.
    ///
    /// Requests foreground permission, background permission when
    /// `background_mode_enabled`, and takes one initial sample. Failures move
    /// the engine to `Failed` and are returned as-is; nothing is retried.
    /// On success the engine is ready but not yet sampling.
    #[instrument(skip_all)]
    pub async fn initialize(&self, config: Option<TrackingConfig>) -> Result<bool, LocationError> {
        let active = {
            let mut inner = self.inner.lock();
            if let Some(config) = config {
                inner.config = config;
            }
            let active = inner.subscription.take();
            inner.state = TrackingState::Initializing;
            self.publish(&inner);
            active
        };

        if let Some(subscription) = active {
            debug!("Re-initializing; closing active subscription");
            subscription.cancellation.cancel();
        }

        let config = self.config();
        match self.prepare(&config).await {
            Ok(sample) => {
                let mut inner = self.inner.lock();
                inner.last_sampled = Some(sample);
                inner.last_error = None;
                inner.state = TrackingState::Initializing;
                self.publish(&inner);
                info!(background = config.background_mode_enabled, "Location tracking initialized");
                Ok(true)
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    async fn prepare(&self, config: &TrackingConfig) -> Result<Coordinate, LocationError> {
        if self.source.request_foreground_permission().await? == PermissionStatus::Denied {
            return Err(LocationError::PermissionDenied { scope: PermissionScope::Foreground });
        }

        if config.background_mode_enabled
            && self.source.request_background_permission().await? == PermissionStatus::Denied
        {
            return Err(LocationError::PermissionDenied { scope: PermissionScope::Background });
        }

        self.source.current_position(config.accuracy()).await
    }

    fn fail(&self, err: LocationError) {
        warn!(error = %err, "Location tracking failed");
        let mut inner = self.inner.lock();
        if let Some(subscription) = inner.subscription.take() {
            subscription.cancellation.cancel();
        }
        inner.last_error = Some(err.to_string());
        inner.state = TrackingState::Failed(err);
        self.publish(&inner);
    }

    /// Open the sampling subscription. Returns `true` when sampling is active.
    ///
    /// Idempotent while `Active`. An uninitialized or failed engine is
    /// initialized first.
    #[instrument(skip_all)]
    pub async fn start_tracking(self: &Arc<Self>) -> bool {
        let state = self.state();
        if state.is_active() {
            return true;
        }

        if !state.is_ready() && self.initialize(None).await.is_err() {
            return false;
        }

        let config = self.config();
        let samples = match self.source.watch_position(config.watch_options()).await {
            Ok(samples) => samples,
            Err(err) => {
                self.fail(err);
                return false;
            }
        };

        let mut inner = self.inner.lock();
        if inner.state.is_active() {
            debug!("Tracking started concurrently; dropping duplicate subscription");
            return true;
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let cancellation = CancellationToken::new();
        let heartbeat = (config.min_interval_ms > 0)
            .then(|| Duration::from_millis(config.min_interval_ms));
        let task = tokio::spawn(run_sampling(
            Arc::downgrade(self),
            samples,
            cancellation.clone(),
            generation,
            heartbeat,
        ));

        inner.subscription = Some(Subscription { cancellation, task, generation });
        inner.state = TrackingState::Active;
        inner.last_error = None;
        self.publish(&inner);

        info!(
            min_interval_ms = config.min_interval_ms,
            min_distance_meters = config.min_distance_meters,
            high_accuracy = config.high_accuracy,
            background = config.background_mode_enabled,
            "Location tracking started"
        );
        true
    }

    /// Close the sampling subscription.
    ///
    /// Dispatches already in flight run to completion, but a failure that
    /// lands after this call is dropped rather than queued.
    pub fn stop_tracking(&self) {
        let mut inner = self.inner.lock();
        let Some(subscription) = inner.subscription.take() else {
            return;
        };

        subscription.cancellation.cancel();
        if inner.state.is_active() {
            inner.state = TrackingState::Suspended;
        }
        self.publish(&inner);
        info!("Location tracking stopped");
    }

    /// Stop sampling and wait for the sampling task to exit.
    pub async fn shutdown(&self) {
        let subscription = {
            let mut inner = self.inner.lock();
            let subscription = inner.subscription.take();
            if inner.state.is_active() {
                inner.state = TrackingState::Suspended;
            }
            self.publish(&inner);
            subscription
        };

        let Some(subscription) = subscription else {
            return;
        };

        subscription.cancellation.cancel();
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, subscription.task).await.is_err() {
            warn!("Sampling task did not stop within timeout");
        }
    }

    /// One-shot position fetch that bypasses the throttle.
    ///
    /// Updates the last sampled location but never dispatches.
    pub async fn get_current_location(&self) -> Option<Coordinate> {
        let accuracy = self.config().accuracy();
        match self.source.current_position(accuracy).await {
            Ok(sample) => {
                let mut inner = self.inner.lock();
                inner.last_sampled = Some(sample.clone());
                self.publish(&inner);
                Some(sample)
            }
            Err(err) => {
                warn!(error = %err, "Failed to read current position");
                None
            }
        }
    }

    /// Fetch the current position and send it immediately.
    ///
    /// Returns `true` only when the backend accepted the update; a deferred
    /// update counts as not sent.
    #[instrument(skip_all)]
    pub async fn force_location_update(&self) -> bool {
        let accuracy = self.config().accuracy();
        let sample = match self.source.current_position(accuracy).await {
            Ok(sample) => sample,
            Err(err) => {
                warn!(error = %err, "Forced update failed to read position");
                return false;
            }
        };

        {
            let mut inner = self.inner.lock();
            inner.last_sampled = Some(sample.clone());
            inner.last_dispatched =
                Some(DispatchMark { coordinate: sample.clone(), at: self.clock.now() });
            self.publish(&inner);
        }

        self.dispatch_location(sample, None).await == SubmitOutcome::Delivered
    }

    /// Merge `patch` into the config, restarting an active subscription so
    /// the new thresholds take effect.
    ///
    /// Returns `false` only when a restart was needed and failed.
    pub async fn update_config(self: &Arc<Self>, patch: TrackingConfigPatch) -> bool {
        let was_active = {
            let mut inner = self.inner.lock();
            inner.config = inner.config.merge(&patch);
            debug!(config = ?inner.config, "Tracking config updated");
            self.publish(&inner);
            inner.state.is_active()
        };

        if !was_active {
            return true;
        }

        self.stop_tracking();
        self.start_tracking().await
    }

    /// Run one sample through the throttle and, if accepted, dispatch it.
    ///
    /// The sampling task performs the same step but spawns the dispatch so
    /// that sample delivery never waits on the network.
    pub async fn handle_sample(&self, sample: Coordinate) -> DispatchDecision {
        let decision = self.accept(sample.clone());
        if decision.should_dispatch() {
            self.dispatch_location(sample, None).await;
        }
        decision
    }

    /// Record `sample` as the latest position and apply the throttle.
    ///
    /// An accepted sample becomes the new dispatch mark immediately.
    fn accept(&self, sample: Coordinate) -> DispatchDecision {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let decision =
            ThrottlePolicy::evaluate(inner.last_dispatched.as_ref(), &sample, now, &inner.config);
        if decision.should_dispatch() {
            inner.last_dispatched = Some(DispatchMark { coordinate: sample.clone(), at: now });
        }
        inner.last_sampled = Some(sample);
        self.publish(&inner);

        debug!(?decision, "Sample evaluated");
        decision
    }

    async fn dispatch_location(
        &self,
        sample: Coordinate,
        cancel: Option<&CancellationToken>,
    ) -> SubmitOutcome {
        let operation = QueuedOperation::location_update(&sample);
        let outcome = match cancel {
            Some(token) => self.queue.submit_guarded(operation, token).await,
            None => self.queue.submit(operation).await,
        };

        match &outcome {
            SubmitOutcome::Delivered => debug!("Location update delivered"),
            SubmitOutcome::Queued => debug!("Location update deferred to offline queue"),
            SubmitOutcome::Discarded => debug!("Location update dropped after stop"),
        }
        outcome
    }

    /// Re-evaluate the last sampled position after the source has been
    /// silent for a full `min_interval_ms`.
    fn heartbeat(&self) -> Option<(Coordinate, DispatchDecision)> {
        let sample = self.inner.lock().last_sampled.clone()?;
        let decision = self.accept(sample.clone());
        Some((sample, decision))
    }

    fn on_subscription_closed(&self, generation: u64) {
        let mut inner = self.inner.lock();
        let current = inner.subscription.as_ref().map(|subscription| subscription.generation);
        if current != Some(generation) {
            return;
        }

        inner.subscription = None;
        let err = LocationError::SubscriptionClosed;
        warn!(error = %err, "Position source ended the subscription");
        inner.last_error = Some(err.to_string());
        inner.state = TrackingState::Failed(err);
        self.publish(&inner);
    }

    fn publish(&self, inner: &EngineState) {
        self.snapshot_tx.send_replace(inner.snapshot());
    }

    /// Latest published state.
    pub fn snapshot(&self) -> TrackingSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Watch every published [`TrackingSnapshot`].
    pub fn subscribe(&self) -> watch::Receiver<TrackingSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrackingState {
        self.inner.lock().state.clone()
    }

    /// Current tracking thresholds and modes.
    pub fn config(&self) -> TrackingConfig {
        self.inner.lock().config.clone()
    }

    pub fn queue(&self) -> &Arc<PersistentRequestQueue> {
        &self.queue
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        if let Some(subscription) = self.inner.get_mut().subscription.take() {
            subscription.cancellation.cancel();
        }
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn run_sampling(
    engine: Weak<SyncEngine>,
    mut samples: SampleStream,
    cancel: CancellationToken,
    generation: u64,
    period: Option<Duration>,
) {
    let mut heartbeat = period.map(|period| {
        let mut interval = tokio::time::interval_at(TokioInstant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let accepted = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sample = samples.recv() => {
                let Some(engine) = engine.upgrade() else { break };
                match sample {
                    Some(sample) => {
                        if let Some(interval) = heartbeat.as_mut() {
                            interval.reset();
                        }
                        let decision = engine.accept(sample.clone());
                        decision.should_dispatch().then_some((engine, sample))
                    }
                    None => {
                        engine.on_subscription_closed(generation);
                        break;
                    }
                }
            }
            () = tick(&mut heartbeat) => {
                let Some(engine) = engine.upgrade() else { break };
                match engine.heartbeat() {
                    Some((sample, decision)) if decision.should_dispatch() => {
                        Some((engine, sample))
                    }
                    _ => None,
                }
            }
        };

        if let Some((engine, sample)) = accepted {
            let token = cancel.clone();
            tokio::spawn(async move {
                engine.dispatch_location(sample, Some(&token)).await;
            });
        }
    }

    debug!(generation, "Sampling task exited");
}
