//! CLI error type.

use thiserror::Error;

use tilestream::config::ConfigError;
use tilestream::coord::CoordError;
use tilestream::service::ServiceError;

/// Errors surfaced to the user with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid coordinates: {0}")]
    Coord(#[from] CoordError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}
