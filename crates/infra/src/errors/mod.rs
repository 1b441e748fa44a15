//! Infrastructure error types

mod conversions;

pub(crate) use conversions::IntoDispatchError;
use thiserror::Error;
use waypoint_domain::{ConfigError, StorageError};

/// Failures while wiring adapters together.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Replay source error: {0}")]
    Replay(String),
}

/// Result alias for infrastructure operations.
pub type InfraResult<T> = std::result::Result<T, InfraError>;
