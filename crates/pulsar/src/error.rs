//! Top-level error type.

use pulsar_config::ConfigError;
use pulsar_server::ServerError;
use pulsar_telemetry::TelemetryError;
use thiserror::Error;

/// Any error raised by the entry points.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The server could not boot.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Logging could not be set up.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// No handler is registered under the name.
    #[error("unknown handler: {0}")]
    UnknownHandler(String),
}

/// Result type for the entry points.
pub type Result<T, E = Error> = std::result::Result<T, E>;
