//! Bind addresses.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::ConfigError;

/// A listen address in `scheme://host:port` form.
///
/// # Example
///
/// ```
/// use pulsar_config::Bind;
///
/// let bind: Bind = "tcp://0.0.0.0:9292".parse().unwrap();
/// assert_eq!(bind.port(), Some(9292));
/// assert_eq!(bind.to_string(), "tcp://0.0.0.0:9292");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bind {
    /// A TCP listener.
    Tcp {
        /// Host name or IP address, without IPv6 brackets.
        host: String,
        /// Port; `0` requests an ephemeral port.
        port: u16,
    },
    /// A unix domain socket.
    Unix {
        /// Socket path.
        path: PathBuf,
    },
}

impl Bind {
    /// Creates a TCP bind.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Creates a unix socket bind.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Derives the bind for a host and port.
    ///
    /// Hosts starting with `/` or `.` are unix socket paths.
    pub fn from_host_port(host: &str, port: u16) -> Self {
        if host.starts_with('/') || host.starts_with('.') {
            Self::unix(host)
        } else {
            Self::tcp(host, port)
        }
    }

    /// Returns the port of a TCP bind.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Tcp { port, .. } => Some(*port),
            Self::Unix { .. } => None,
        }
    }

    /// Returns the host of a TCP bind.
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Tcp { host, .. } => Some(host),
            Self::Unix { .. } => None,
        }
    }

    /// Returns the path of a unix bind.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Tcp { .. } => None,
            Self::Unix { path } => Some(path),
        }
    }

    /// Returns the URL scheme.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp { .. } => "tcp",
            Self::Unix { .. } => "unix",
        }
    }
}

impl fmt::Display for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{host}]:{port}"),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            Self::Unix { path } => write!(f, "unix://{}", path.display()),
        }
    }
}

impl FromStr for Bind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::invalid_option("Binds", format!("{s}: {reason}"));

        if let Some(rest) = s.strip_prefix("tcp://") {
            let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
                bracketed
                    .split_once("]:")
                    .ok_or_else(|| invalid("expected [host]:port"))?
            } else {
                rest.rsplit_once(':')
                    .ok_or_else(|| invalid("expected host:port"))?
            };

            if host.is_empty() {
                return Err(invalid("missing host"));
            }
            let port = port.parse().map_err(|_| invalid("invalid port"))?;

            Ok(Self::tcp(host, port))
        } else if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(invalid("missing socket path"));
            }
            Ok(Self::unix(path))
        } else {
            Err(invalid("unsupported scheme, expected tcp:// or unix://"))
        }
    }
}
