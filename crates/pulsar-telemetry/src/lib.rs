//! Logging setup for Pulsar.
//!
//! Pulsar libraries only emit `tracing` events. Hosts that do not install
//! their own subscriber can call [`init_logging`] with a [`LogConfig`],
//! usually derived from the resolved server configuration:
//!
//! ```rust,ignore
//! use pulsar_telemetry::{init_logging, LogConfig};
//!
//! let config = pulsar::config(|| app, options)?;
//! init_logging(&LogConfig::for_config(config.effective()))?;
//! ```
//!
//! Output is JSON outside the `development` environment. The `PULSAR_LOG`
//! environment variable accepts any `EnvFilter` directive and takes
//! precedence over the configured level.

#![doc(html_root_url = "https://docs.rs/pulsar-telemetry/0.1.0")]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LOG_ENV};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
