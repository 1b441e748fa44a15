//! Replayed position source
//!
//! Plays back a recorded track, one [`Coordinate`] per line of JSON, at a
//! fixed pace. Useful for running the agent on machines without positioning
//! hardware and for end-to-end tests. Permissions are always granted.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};
use waypoint_core::{PositionSource, SampleStream};
use waypoint_domain::{Accuracy, Coordinate, LocationError, PermissionStatus, WatchOptions};

use crate::errors::{InfraError, InfraResult};

const CHANNEL_CAPACITY: usize = 16;

/// [`PositionSource`] replaying a fixed list of fixes.
///
/// Fixes are re-stamped with the current time as they are emitted. The
/// cursor is shared between one-shot reads and subscriptions, so the track
/// advances regardless of who consumes it.
#[derive(Debug, Clone)]
pub struct ReplayPositionSource {
    fixes: Arc<[Coordinate]>,
    cursor: Arc<Mutex<usize>>,
    pace: Duration,
    looping: bool,
}

impl ReplayPositionSource {
    pub fn new(fixes: Vec<Coordinate>, pace: Duration) -> Self {
        Self { fixes: fixes.into(), cursor: Arc::new(Mutex::new(0)), pace, looping: false }
    }

    /// Restart from the first fix after the last one instead of stopping.
    #[must_use]
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Parse a JSON-lines track. Blank lines and lines starting with `#` are
    /// skipped.
    pub fn parse(contents: &str, pace: Duration) -> InfraResult<Self> {
        let fixes = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with('#')
            })
            .map(|(index, line)| {
                serde_json::from_str::<Coordinate>(line)
                    .map_err(|err| InfraError::Replay(format!("line {}: {err}", index + 1)))
            })
            .collect::<InfraResult<Vec<_>>>()?;

        if fixes.is_empty() {
            return Err(InfraError::Replay("track contains no fixes".into()));
        }
        Ok(Self::new(fixes, pace))
    }

    pub async fn from_path(path: impl AsRef<Path>, pace: Duration) -> InfraResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| InfraError::Replay(format!("{}: {err}", path.display())))?;
        let source = Self::parse(&contents, pace)?;
        info!(path = %path.display(), fixes = source.fixes.len(), "Loaded replay track");
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Take the fix under the cursor and advance it.
    fn next_fix(&self) -> Option<Coordinate> {
        next_fix(&self.fixes, &self.cursor, self.looping)
    }
}

fn next_fix(fixes: &[Coordinate], cursor: &Mutex<usize>, looping: bool) -> Option<Coordinate> {
    let mut index = cursor.lock();
    if *index >= fixes.len() {
        if !looping || fixes.is_empty() {
            return None;
        }
        *index = 0;
    }

    let fix = fixes.get(*index)?;
    *index += 1;
    Some(Coordinate { captured_at: Utc::now(), ..fix.clone() })
}

#[async_trait]
impl PositionSource for ReplayPositionSource {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn request_background_permission(&self) -> Result<PermissionStatus, LocationError> {
        Ok(PermissionStatus::Granted)
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<Coordinate, LocationError> {
        self.next_fix()
            .ok_or_else(|| LocationError::CapabilityUnavailable("replay track exhausted".into()))
    }

    async fn watch_position(&self, options: WatchOptions) -> Result<SampleStream, LocationError> {
        if self.fixes.is_empty() {
            return Err(LocationError::CapabilityUnavailable("replay track is empty".into()));
        }

        debug!(?options, pace_ms = self.pace.as_millis(), "Starting replay subscription");
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let fixes = Arc::clone(&self.fixes);
        let cursor = Arc::clone(&self.cursor);
        let pace = self.pace;
        let looping = self.looping;

        tokio::spawn(async move {
            while let Some(fix) = next_fix(&fixes, &cursor, looping) {
                if tx.send(fix).await.is_err() {
                    break;
                }
                tokio::select! {
                    () = tx.closed() => break,
                    () = tokio::time::sleep(pace) => {}
                }
            }
            debug!("Replay subscription ended");
        });

        Ok(rx)
    }
}
