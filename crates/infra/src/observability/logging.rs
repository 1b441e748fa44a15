//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level so that a single
//! run can be made more verbose without editing config files.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use waypoint_domain::{ConfigError, LoggingConfig};

/// Build the filter for `config`, honouring `RUST_LOG` when set.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ConfigError::Invalid(format!("logging.level {:?}: {e}", config.level)))
}

/// Install the global tracing subscriber.
///
/// # Errors
/// Returns `ConfigError::Invalid` for an unparseable level and when a global
/// subscriber has already been installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = env_filter(config)?;

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).compact().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("tracing subscriber already installed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparseable_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig { level: "waypoint=loud".into(), json: false };
        assert!(matches!(env_filter(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn accepts_directive_lists() {
        let config = LoggingConfig { level: "info,waypoint_core=debug".into(), json: true };
        assert!(env_filter(&config).is_ok());
    }
}
