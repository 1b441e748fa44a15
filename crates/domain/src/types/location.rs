//! Position samples and tracking configuration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MIN_DISTANCE_METERS, DEFAULT_MIN_INTERVAL_MS};

/// A single position sample.
///
/// Coordinates are values: the engine replaces them, it never edits one in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, when the source reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// When the source captured the sample
    pub captured_at: DateTime<Utc>,
}

impl Coordinate {
    /// Create a sample captured now.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, accuracy: None, captured_at: Utc::now() }
    }

    /// Create a sample with an explicit capture time.
    pub fn at(latitude: f64, longitude: f64, captured_at: DateTime<Utc>) -> Self {
        Self { latitude, longitude, accuracy: None, captured_at }
    }

    /// Attach an accuracy radius.
    #[must_use]
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }
}

/// Requested positioning accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    High,
    Balanced,
}

impl Accuracy {
    pub fn from_high_accuracy(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Balanced
        }
    }
}

/// Outcome of a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Sampling thresholds and modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub background_mode_enabled: bool,
    pub min_interval_ms: u64,
    pub min_distance_meters: f64,
    pub high_accuracy: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            background_mode_enabled: false,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            min_distance_meters: DEFAULT_MIN_DISTANCE_METERS,
            high_accuracy: true,
        }
    }
}

impl TrackingConfig {
    /// Return a copy with every field present in `patch` overridden.
    #[must_use]
    pub fn merge(&self, patch: &TrackingConfigPatch) -> Self {
        Self {
            background_mode_enabled: patch
                .background_mode_enabled
                .unwrap_or(self.background_mode_enabled),
            min_interval_ms: patch.min_interval_ms.unwrap_or(self.min_interval_ms),
            min_distance_meters: patch.min_distance_meters.unwrap_or(self.min_distance_meters),
            high_accuracy: patch.high_accuracy.unwrap_or(self.high_accuracy),
        }
    }

    pub fn accuracy(&self) -> Accuracy {
        Accuracy::from_high_accuracy(self.high_accuracy)
    }

    /// Options for a watch subscription derived from this config.
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            accuracy: self.accuracy(),
            min_interval_ms: self.min_interval_ms,
            min_distance_meters: self.min_distance_meters,
            background: self.background_mode_enabled,
        }
    }
}

/// Partial update for [`TrackingConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfigPatch {
    pub background_mode_enabled: Option<bool>,
    pub min_interval_ms: Option<u64>,
    pub min_distance_meters: Option<f64>,
    pub high_accuracy: Option<bool>,
}

/// Parameters handed to a position source when opening a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    pub min_interval_ms: u64,
    pub min_distance_meters: f64,
    pub background: bool,
}
