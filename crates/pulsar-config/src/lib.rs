//! Configuration resolution for Pulsar.
//!
//! Pulsar merges three origins of configuration:
//!
//! - built-in defaults (port 9292 on `0.0.0.0`)
//! - an optional configuration script under the application directory
//! - options passed by the host application
//!
//! Host options come with a set of keys the caller supplied *explicitly*.
//! Explicit values always win. Other caller values are suggestions that the
//! script may override. Every key resolves through [`ConfigLayer`]:
//!
//! ```text
//! Default < Suggested < Script < Explicit
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pulsar_config::{ConfigResolver, OptionKey, Options};
//!
//! # fn main() -> Result<(), pulsar_config::ConfigError> {
//! let options = Options::new()
//!     .port(5001)
//!     .silent(true)
//!     .user_supplied_options([OptionKey::Silent]);
//!
//! // Looks for config/pulsar/development.toml, then config/pulsar.toml.
//! let config = ConfigResolver::resolve_options(&options)?;
//!
//! println!("binding {:?}", config.bind_urls());
//! # Ok(())
//! # }
//! ```
//!
//! # Script Format
//!
//! ```toml
//! port = 6001
//! host = "127.0.0.1"
//! binds = ["tcp://127.0.0.1:6001"]
//! silent = false
//! verbose = true
//! threads = "1:8"
//! environment = "staging"
//!
//! [extra]
//! worker_timeout = 60
//! ```

#![doc(html_root_url = "https://docs.rs/pulsar-config/0.1.0")]

mod bind;
mod effective;
mod error;
mod options;
mod resolver;
pub mod script;
mod source;

pub use bind::Bind;
pub use effective::{EffectiveConfig, Threads};
pub use error::ConfigError;
pub use options::{valid_options, OptionKey, Options};
pub use resolver::{ConfigResolver, NO_SCRIPT};
pub use script::{ConfigScript, ScriptFormat};
pub use source::{
    ConfigLayer, ConfigSource, DEFAULT_ENVIRONMENT, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_THREADS,
};
