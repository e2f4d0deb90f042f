//! Status output.

use std::time::Duration;

use pulsar_config::EffectiveConfig;

use crate::BoundAddr;

/// Emits launcher status through `tracing`.
///
/// `Silent` mutes status messages. Request lines are only emitted when
/// `Verbose` is set. Errors are always emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Events {
    silent: bool,
    verbose: bool,
}

impl Events {
    /// Creates an emitter with explicit flags.
    pub fn new(silent: bool, verbose: bool) -> Self {
        Self { silent, verbose }
    }

    /// Creates an emitter from resolved configuration.
    pub fn for_config(config: &EffectiveConfig) -> Self {
        Self::new(config.silent(), config.verbose())
    }

    /// Whether status messages are muted.
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Whether request lines are emitted.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Startup banner.
    pub fn booting(&self, config: &EffectiveConfig) {
        if self.silent {
            return;
        }
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = config.environment(),
            min_threads = config.threads().min,
            max_threads = config.threads().max,
            "Pulsar starting"
        );
        if let Some(script) = config.script_path() {
            tracing::info!(script = %script.display(), "loaded configuration script");
        }
    }

    /// A listener is bound.
    pub fn listening(&self, addr: &BoundAddr) {
        if !self.silent {
            tracing::info!(addr = %addr, "listening on {addr}");
        }
    }

    /// Boot is complete.
    pub fn ready(&self, elapsed: Duration) {
        if !self.silent {
            tracing::info!(elapsed = ?elapsed, "ready to accept connections");
        }
    }

    /// Shutdown has begun.
    pub fn stopping(&self, open_connections: usize) {
        if !self.silent {
            tracing::info!(open_connections, "stopping");
        }
    }

    /// Every listener is closed.
    pub fn stopped(&self) {
        if !self.silent {
            tracing::info!("stopped");
        }
    }

    /// A request was answered.
    pub fn request(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        if self.verbose {
            tracing::info!(
                method,
                path,
                status,
                elapsed = ?elapsed,
                "{method} {path} {status}"
            );
        }
    }

    /// The application failed to produce a response.
    pub fn app_error(&self, method: &str, path: &str, reason: &str) {
        tracing::error!(method, path, reason, "application error");
    }
}
