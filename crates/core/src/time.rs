//! Clocks for the throttle
//!
//! The throttle compares monotonic instants, so every time-dependent decision
//! in the engine goes through a [`Clock`]. Production code uses
//! [`SystemClock`], which reads tokio's timer so that the engine's heartbeat
//! and its throttle agree on elapsed time. Unit tests drive a [`ManualClock`]
//! forward explicitly; tests that need the heartbeat pause tokio time and
//! keep [`SystemClock`].
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use waypoint_core::time::{Clock, ManualClock};
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic instant used for elapsed-time comparisons.
    fn now(&self) -> Instant;

    /// Wall-clock time used for timestamps.
    fn wall_clock(&self) -> DateTime<Utc>;
}

/// Clock backed by the OS through tokio's timer.
///
/// Follows `tokio::time::pause` and `advance` when the runtime's clock is
/// paused; otherwise identical to `Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same elapsed time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: Instant,
    base_wall_clock: DateTime<Utc>,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            base_wall_clock: Utc::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Simulate time passing without waiting.
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Jump to an absolute offset from the clock's creation.
    pub fn set_elapsed(&self, duration: Duration) {
        *self.elapsed.lock() = duration;
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed =
            chrono::Duration::from_std(self.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.base_wall_clock + elapsed
    }
}
