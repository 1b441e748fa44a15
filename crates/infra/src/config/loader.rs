//! Configuration loader
//!
//! Environment variables win; a config file is consulted only when
//! `WAYPOINT_API_BASE_URL` is unset. Files may be TOML or JSON, chosen by
//! extension.
//!
//! Every section has defaults, so a file only needs the values it changes.
//! The loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `WAYPOINT_API_BASE_URL`: Backend base URL (required for env loading)
//! - `WAYPOINT_API_TOKEN`: Bearer token sent with every request
//! - `WAYPOINT_API_TIMEOUT_SECS`: HTTP timeout in seconds
//! - `WAYPOINT_STORAGE_DIR`: Directory holding the persisted offline queue
//! - `WAYPOINT_MIN_INTERVAL_MS`: Time floor between dispatches
//! - `WAYPOINT_MIN_DISTANCE_METERS`: Distance that forces a dispatch
//! - `WAYPOINT_HIGH_ACCURACY`: Request high-accuracy fixes (true/false)
//! - `WAYPOINT_BACKGROUND_MODE`: Keep sampling in the background (true/false)
//! - `WAYPOINT_LOG_LEVEL`: Default log filter when `RUST_LOG` is unset
//! - `WAYPOINT_LOG_JSON`: Emit JSON log lines (true/false)
//! - `WAYPOINT_PROBE_URL`: Health URL polled for connectivity
//!
//! ## File Locations
//! Searched in order:
//! 1. `./waypoint.{toml,json}` or `./config.{toml,json}` (current working directory)
//! 2. `../waypoint.{toml,json}` or `../config.{toml,json}` (parent directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use waypoint_domain::{AppConfig, ConfigError};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["waypoint.toml", "waypoint.json", "config.toml", "config.json"];

/// Load and validate configuration, environment first.
///
/// # Errors
/// Returns `ConfigError` if neither source yields a configuration, a file
/// cannot be parsed, an environment value is malformed, or validation fails.
pub fn load() -> Result<AppConfig, ConfigError> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(ConfigError::NotFound(reason)) => {
            tracing::debug!(%reason, "Environment configuration incomplete, trying file");
            load_from_file(None)?
        }
        Err(err) => return Err(err),
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// `WAYPOINT_API_BASE_URL` must be present; every other variable overrides
/// the corresponding default when set.
///
/// # Errors
/// Returns `ConfigError::NotFound` when the base URL is missing and
/// `ConfigError::Invalid` when a value cannot be parsed.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::default();

    config.api.base_url = env_var("WAYPOINT_API_BASE_URL")?;
    config.api.auth_token = std::env::var("WAYPOINT_API_TOKEN").ok();
    if let Some(timeout) = env_parse("WAYPOINT_API_TIMEOUT_SECS")? {
        config.api.timeout_secs = timeout;
    }
    if let Ok(dir) = std::env::var("WAYPOINT_STORAGE_DIR") {
        config.queue.storage_dir = dir;
    }

    if let Some(interval) = env_parse("WAYPOINT_MIN_INTERVAL_MS")? {
        config.tracking.min_interval_ms = interval;
    }
    if let Some(distance) = env_parse("WAYPOINT_MIN_DISTANCE_METERS")? {
        config.tracking.min_distance_meters = distance;
    }
    config.tracking.high_accuracy =
        env_bool("WAYPOINT_HIGH_ACCURACY", config.tracking.high_accuracy);
    config.tracking.background_mode_enabled =
        env_bool("WAYPOINT_BACKGROUND_MODE", config.tracking.background_mode_enabled);

    if let Ok(level) = std::env::var("WAYPOINT_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("WAYPOINT_LOG_JSON", config.logging.json);

    if let Ok(url) = std::env::var("WAYPOINT_PROBE_URL") {
        config.connectivity.probe_url = Some(url);
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ConfigError::NotFound` if no file exists and
/// `ConfigError::Parse` if the contents are malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConfigError::NotFound("no config file in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ConfigError::Parse(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid JSON format: {e}"))),
        _ => Err(ConfigError::Parse(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .map_err(|_| ConfigError::NotFound(format!("missing environment variable {key}")))
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::Invalid(format!("{key}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
