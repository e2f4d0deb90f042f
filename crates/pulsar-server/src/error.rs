//! Server error types.

use std::io;
use thiserror::Error;

/// Errors raised while booting a launcher.
///
/// Once a launcher is running nothing surfaces as an error: connection and
/// application failures are logged and answered with a 500.
#[derive(Error, Debug)]
pub enum ServerError {
    /// A listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The bind URL.
        addr: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The request cannot be carried out by this launcher or platform.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The server thread could not be spawned.
    #[error("failed to spawn server thread: {0}")]
    ThreadSpawn(#[source] io::Error),
}

impl ServerError {
    /// Create a new bind error.
    pub fn bind(addr: impl ToString, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.to_string(),
            source,
        }
    }

    /// Returns `true` for address binding failures.
    pub fn is_bind_error(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let err = ServerError::bind(
            "tcp://127.0.0.1:80",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );
        assert!(err.is_bind_error());
        assert!(err.to_string().contains("tcp://127.0.0.1:80"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unsupported_display() {
        let err = ServerError::Unsupported("launcher already booted".into());
        assert!(!err.is_bind_error());
        assert_eq!(err.to_string(), "unsupported: launcher already booted");
    }
}
