//! Waypoint agent
//!
//! Runs the tracking stack against a recorded track until Ctrl-C.
//!
//! Usage: `waypoint-agent [TRACK.jsonl]`. Without an argument the track path
//! is read from `WAYPOINT_REPLAY_PATH`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use waypoint_core::{LocationHandle, PersistentRequestQueue, QueueEvent};
use waypoint_infra::observability::init_tracing;
use waypoint_infra::{config, ReplayPositionSource, WaypointRuntime};

const DEFAULT_REPLAY_PACE_MS: u64 = 1_000;

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before the config loader reads WAYPOINT_* variables
    let dotenv = dotenvy::dotenv();
    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise logging")?;
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(err) => debug!(error = %err, "No .env file loaded"),
    }

    let track_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("WAYPOINT_REPLAY_PATH").ok())
        .context("no replay track given (pass a path or set WAYPOINT_REPLAY_PATH)")?;
    let pace = std::env::var("WAYPOINT_REPLAY_PACE_MS")
        .ok()
        .map(|value| value.parse::<u64>())
        .transpose()
        .context("WAYPOINT_REPLAY_PACE_MS must be a number of milliseconds")?
        .unwrap_or(DEFAULT_REPLAY_PACE_MS);

    let source = ReplayPositionSource::from_path(&track_path, Duration::from_millis(pace))
        .await
        .with_context(|| format!("failed to load replay track {track_path}"))?
        .looping(true);

    let runtime = WaypointRuntime::build(&config, Arc::new(source))
        .await
        .context("failed to build runtime")?;
    let handle = runtime.handle();

    tokio::spawn(log_snapshots(handle.clone()));
    tokio::spawn(log_queue_events(Arc::clone(runtime.queue())));

    if !handle.start().await {
        let reason = handle.last_error().unwrap_or_else(|| "unknown error".to_string());
        runtime.shutdown().await;
        bail!("location tracking failed to start: {reason}");
    }

    info!(track = %track_path, pace_ms = pace, "Waypoint agent running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;

    info!("Shutting down");
    runtime.shutdown().await;
    Ok(())
}

async fn log_snapshots(mut handle: LocationHandle) {
    let mut last_error = None;
    while let Some(snapshot) = handle.changed().await {
        debug!(
            state = ?snapshot.state,
            tracking = snapshot.is_tracking,
            location = ?snapshot.current_location.as_ref().map(|c| (c.latitude, c.longitude)),
            "Tracking snapshot changed"
        );
        if snapshot.last_error != last_error {
            if let Some(error) = &snapshot.last_error {
                warn!(%error, "Tracking reported an error");
            }
            last_error = snapshot.last_error;
        }
    }
}

async fn log_queue_events(queue: Arc<PersistentRequestQueue>) {
    let mut events = queue.subscribe_events();
    loop {
        match events.recv().await {
            Ok(QueueEvent::DrainFinished(report)) => info!(?report, "Offline queue drained"),
            Ok(event) => debug!(?event, "Queue event"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Queue event log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}
