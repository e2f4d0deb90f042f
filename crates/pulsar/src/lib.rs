//! # Pulsar
//!
//! **Embeddable HTTP application server with layered configuration**
//!
//! Pulsar runs a request handler on a dedicated server thread and hands
//! control back to the caller once every listener is bound:
//!
//! - Configuration merges built-in defaults, an optional configuration
//!   script and caller options, with options the user typed explicitly
//!   winning over everything else.
//! - [`run`] blocks until the [`Launcher`] passed to the readiness callback
//!   is stopped. `stop` may be called from any thread, any number of times.
//! - Handlers are looked up by name through a [`HandlerRegistry`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulsar::prelude::*;
//!
//! fn main() -> pulsar::Result<()> {
//!     let app = |req: AppRequest| AppResponse::text(200, format!("hello from {}", req.path_info));
//!     let options = Options::new().port(8080).user_supplied_options([OptionKey::Port]);
//!
//!     pulsar::run(app, options, |launcher, ready| {
//!         println!("listening on {:?} after {:?}", launcher.connected_port(), ready.boot_duration());
//!     })
//! }
//! ```
//!
//! ## Configuration precedence
//!
//! ```text
//! Explicit (user typed) > Script (config/pulsar.toml) > Suggested (host default) > Default
//! ```

#![doc(html_root_url = "https://docs.rs/pulsar/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod handler;
pub mod registry;

pub use error::{Error, Result};
pub use handler::{config, run, valid_options, Configuration};
pub use registry::{Handler, HandlerRegistry, PulsarHandler, ReadyCallback, HANDLER_NAME};

pub use pulsar_config::{
    Bind, ConfigError, ConfigLayer, ConfigResolver, EffectiveConfig, OptionKey, Options, Threads,
    DEFAULT_PORT,
};
pub use pulsar_server::{
    AppRequest, AppResponse, Application, BoundAddr, Launcher, LauncherState, ReadyEvent,
    ServerError, SharedApp,
};

pub use pulsar_config as configuration;
pub use pulsar_server as server;
pub use pulsar_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use pulsar::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{config, run, Configuration, HandlerRegistry};

    pub use pulsar_config::{EffectiveConfig, OptionKey, Options};

    pub use pulsar_server::{
        AppRequest, AppResponse, Application, Launcher, LauncherState, ReadyEvent,
    };

    pub use pulsar_telemetry::{init_logging, LogConfig};
}
