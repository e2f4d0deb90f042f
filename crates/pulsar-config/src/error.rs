//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while resolving configuration.
///
/// Every variant fails resolution as a whole: no partial
/// [`EffectiveConfig`](crate::EffectiveConfig) is ever produced.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration script named explicitly by the caller does not exist.
    #[error("configuration script not found: {path}")]
    ScriptNotFound {
        /// Path to the missing script.
        path: PathBuf,
    },

    /// Failed to read a configuration script.
    #[error("failed to read configuration script: {path}")]
    ScriptRead {
        /// Path to the script.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration script exists but could not be applied.
    #[error("configuration script {path} failed: {reason}")]
    ScriptParse {
        /// Path to the script.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The script has an extension we cannot parse.
    #[error("unsupported configuration script format: {path}")]
    UnsupportedFormat {
        /// Path to the script.
        path: PathBuf,
    },

    /// A recognized option carries a malformed value.
    #[error("invalid value for option {key}: {reason}")]
    InvalidOption {
        /// The option key.
        key: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// I/O error (e.g. the working directory is unavailable).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create a new script not found error.
    pub fn script_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ScriptNotFound { path: path.into() }
    }

    /// Create a new script read error.
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ScriptRead {
            path: path.into(),
            source,
        }
    }

    /// Create a new script parse error.
    pub fn script_parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ScriptParse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid option error.
    pub fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error originated in a configuration script.
    pub fn is_script_error(&self) -> bool {
        matches!(
            self,
            Self::ScriptNotFound { .. }
                | Self::ScriptRead { .. }
                | Self::ScriptParse { .. }
                | Self::UnsupportedFormat { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_not_found_error() {
        let err = ConfigError::script_not_found("/srv/app/config/pulsar.toml");
        assert!(err.to_string().contains("/srv/app/config/pulsar.toml"));
        assert!(err.is_script_error());
    }

    #[test]
    fn test_script_parse_error() {
        let err = ConfigError::script_parse("config/pulsar.toml", "expected an integer");
        assert!(err.to_string().contains("config/pulsar.toml"));
        assert!(err.to_string().contains("expected an integer"));
        assert!(err.is_script_error());
    }

    #[test]
    fn test_invalid_option_error() {
        let err = ConfigError::invalid_option("Port", "expected an integer port");
        assert!(err.to_string().contains("Port"));
        assert!(err.to_string().contains("expected an integer port"));
        assert!(!err.is_script_error());
    }

    #[test]
    fn test_read_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read_error("config/pulsar.toml", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
