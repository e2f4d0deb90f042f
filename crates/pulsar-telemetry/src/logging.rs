//! Structured logging for Pulsar.
//!
//! Installs a global `tracing` subscriber with either JSON or
//! human-readable output.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulsar_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::for_config(&config))?;
//!
//! tracing::info!(port = 9292, "listening");
//! ```

use pulsar_config::EffectiveConfig;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Environment variable that overrides the configured level.
pub const LOG_ENV: &str = "PULSAR_LOG";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Level or filter directive (e.g. `"info"`, `"pulsar_server=debug"`).
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (enter, exit, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread names.
    pub thread_names: bool,

    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: false,
            file_line_info: true,
            thread_names: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_names: false,
            include_target: true,
        }
    }

    /// Derives logging from resolved server configuration.
    ///
    /// The `development` environment gets pretty output, everything else
    /// JSON. The level is `info`, or `warn` when `Silent` is set.
    #[must_use]
    pub fn for_config(config: &EffectiveConfig) -> Self {
        let mut log = if config.environment() == "development" {
            Self::development()
        } else {
            Self::production()
        };

        log.level = if config.silent() { "warn" } else { "info" }.to_string();
        log
    }

    /// Sets the level or filter directive.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Installs the global subscriber.
///
/// [`LOG_ENV`] overrides `config.level` when set.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidFilter` for a malformed level and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.is_empty() => create_env_filter(&directive)?,
        _ => create_env_filter(&config.level)?,
    };

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_names(config.thread_names)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(span_events)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_names(config.thread_names)
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter(format!("{filter}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsar_config::{ConfigResolver, Options};

    fn resolved(options: Options) -> EffectiveConfig {
        ConfigResolver::new().with_options(&options).resolve().unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.file_line_info);
    }

    #[test]
    fn test_for_config_development() {
        let log = LogConfig::for_config(&resolved(Options::new()));
        assert!(!log.json_format);
        assert_eq!(log.level, "info");
    }

    #[test]
    fn test_for_config_silent() {
        let log = LogConfig::for_config(&resolved(
            Options::new().environment("production").silent(true),
        ));
        assert!(log.json_format);
        assert_eq!(log.level, "warn");
    }

    #[test]
    fn test_with_level() {
        let log = LogConfig::production().with_level("pulsar_server=debug");
        assert_eq!(log.level, "pulsar_server=debug");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("pulsar_server=debug,warn").is_ok());
        assert!(create_env_filter("pulsar=notalevel").is_err());
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
