//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_TIMEOUT_SECS, DEFAULT_PROBE_INTERVAL_SECS, MAX_QUEUE_SIZE, MAX_RETRIES,
    QUEUE_STORAGE_KEY,
};
use crate::errors::ConfigError;
use crate::types::TrackingConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub queue: QueueConfig,
    pub tracking: TrackingConfig,
    pub logging: LoggingConfig,
    pub connectivity: ConnectivityConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
}

/// Offline queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_queue_size: usize,
    pub max_retries: u32,
    pub storage_key: String,
    pub storage_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Connectivity detection configuration
///
/// With no `probe_url` the host is expected to push connectivity changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub probe_url: Option<String>,
    pub probe_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            auth_token: None,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: MAX_QUEUE_SIZE,
            max_retries: MAX_RETRIES,
            storage_key: QUEUE_STORAGE_KEY.to_string(),
            storage_dir: ".waypoint".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self { probe_url: None, probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS }
    }
}

impl AppConfig {
    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.queue.max_queue_size == 0 {
            return Err(ConfigError::Invalid("queue.max_queue_size must be at least 1".into()));
        }
        if self.queue.max_retries == 0 {
            return Err(ConfigError::Invalid("queue.max_retries must be at least 1".into()));
        }
        if self.queue.storage_key.is_empty() {
            return Err(ConfigError::Invalid("queue.storage_key must not be empty".into()));
        }
        let distance = self.tracking.min_distance_meters;
        if distance.is_nan() || distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tracking.min_distance_meters must be non-negative, got {distance}"
            )));
        }
        if self.connectivity.probe_url.is_some() && self.connectivity.probe_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "connectivity.probe_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
