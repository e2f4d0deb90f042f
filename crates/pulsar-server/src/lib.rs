//! # Pulsar Server
//!
//! Launcher and HTTP/1.1 serving loop for Pulsar.
//!
//! - [`Launcher`] boots a server on its own thread from an
//!   [`EffectiveConfig`](pulsar_config::EffectiveConfig), reports readiness
//!   through a one-shot callback and stops on demand
//! - [`Application`] is the request handler interface
//! - [`Events`] emits status output, muted by `Silent`
//!
//! ## Example
//!
//! ```no_run
//! use pulsar_config::{ConfigResolver, Options};
//! use pulsar_server::{AppRequest, AppResponse, Launcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigResolver::resolve_options(&Options::new())?;
//! let launcher = Launcher::new(config);
//!
//! launcher.boot(
//!     |req: AppRequest| AppResponse::text(200, format!("hello from {}", req.path_info)),
//!     |_launcher, event| {
//!         for addr in event.bound() {
//!             println!("listening on {addr}");
//!         }
//!     },
//! )?;
//!
//! launcher.wait();
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/pulsar-server/0.1.0")]

mod app;
mod error;
mod events;
mod launcher;
pub mod server;
pub mod shutdown;

pub use app::{AppRequest, AppResponse, Application, SharedApp};
pub use error::ServerError;
pub use events::Events;
pub use launcher::{Launcher, LauncherState, ReadyEvent, SERVER_THREAD_NAME};
pub use server::BoundAddr;
pub use shutdown::ShutdownSignal;
