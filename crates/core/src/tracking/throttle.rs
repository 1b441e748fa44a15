//! Dispatch throttle
//!
//! A sample is worth sending when there is no previously dispatched sample,
//! when at least `min_interval_ms` has elapsed since the last dispatch, or
//! when the device has moved at least `min_distance_meters` from the last
//! dispatched position.

use std::time::Instant;

use waypoint_domain::{Coordinate, TrackingConfig};

use super::filter::haversine_distance;

/// The last sample handed off for dispatch and when it was handed off.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchMark {
    /// Position that was dispatched
    pub coordinate: Coordinate,
    /// Clock reading when it was accepted
    pub at: Instant,
}

/// Why a sample was (or was not) dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Nothing has been dispatched yet
    FirstSample,
    /// `min_interval_ms` passed since the last dispatch
    IntervalElapsed,
    /// Moved at least `min_distance_meters` from the last dispatch
    DistanceExceeded,
    /// Neither threshold met
    Suppressed,
}

impl DispatchDecision {
    /// Whether the sample goes to the backend.
    pub fn should_dispatch(self) -> bool {
        !matches!(self, Self::Suppressed)
    }
}

/// Stateless throttle decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThrottlePolicy;

impl ThrottlePolicy {
    /// Decide whether `sample`, seen at `now`, is worth dispatching given the
    /// last dispatch mark.
    pub fn evaluate(
        last: Option<&DispatchMark>,
        sample: &Coordinate,
        now: Instant,
        config: &TrackingConfig,
    ) -> DispatchDecision {
        let Some(last) = last else {
            return DispatchDecision::FirstSample;
        };

        let elapsed_ms = now.saturating_duration_since(last.at).as_millis();
        if elapsed_ms >= u128::from(config.min_interval_ms) {
            return DispatchDecision::IntervalElapsed;
        }

        if haversine_distance(&last.coordinate, sample) >= config.min_distance_meters {
            return DispatchDecision::DistanceExceeded;
        }

        DispatchDecision::Suppressed
    }
}
