//! On-disk configuration scripts.
//!
//! A script is a TOML (or JSON) document that can override any suggested
//! option:
//!
//! ```toml
//! port = 6001
//! host = "127.0.0.1"
//! threads = "2:8"
//!
//! [extra]
//! worker_timeout = 60
//! ```
//!
//! Unknown top-level keys are rejected. Opaque values belong in `[extra]`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::{Bind, ConfigError, ConfigLayer, ConfigSource, OptionKey, Threads};

/// Directory, relative to the base directory, holding scripts.
pub const SCRIPT_DIR: &str = "config";

/// File stem of the conventional script.
pub const SCRIPT_NAME: &str = "pulsar";

/// Serialization format of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFormat {
    /// TOML document.
    Toml,
    /// JSON document.
    Json,
}

impl ScriptFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// The contents of a configuration script.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigScript {
    /// Listen port.
    pub port: Option<u16>,
    /// Listen host.
    pub host: Option<String>,
    /// Bind URLs.
    pub binds: Option<Vec<String>>,
    /// Suppress status output.
    pub silent: Option<bool>,
    /// Log every request.
    pub verbose: Option<bool>,
    /// Stop on SIGINT and SIGTERM.
    pub signals: Option<bool>,
    /// Thread bounds, `"min:max"` or an integer.
    pub threads: Option<Value>,
    /// Environment name.
    pub environment: Option<String>,
    /// Opaque pass-through values.
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

impl ConfigScript {
    /// Parses script content.
    ///
    /// `origin` only labels errors.
    pub fn parse(content: &str, format: ScriptFormat, origin: &Path) -> Result<Self, ConfigError> {
        match format {
            ScriptFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::script_parse(origin, e.to_string()))
            }
            ScriptFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::script_parse(origin, e.to_string())),
        }
    }

    /// Reads and parses the script at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ScriptFormat::from_path(path)?;
        if !path.exists() {
            return Err(ConfigError::script_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        Self::parse(&content, format, path)
    }

    /// Validates the script and turns it into a [`ConfigLayer::Script`] source.
    pub fn into_source(self, origin: &Path) -> Result<ConfigSource, ConfigError> {
        let reject = |e: ConfigError| ConfigError::script_parse(origin, e.to_string());
        let mut source = ConfigSource::new(ConfigLayer::Script);

        if let Some(port) = self.port {
            source.insert(OptionKey::Port, port);
        }
        if let Some(host) = self.host {
            if host.is_empty() {
                return Err(ConfigError::script_parse(origin, "host must not be empty"));
            }
            source.insert(OptionKey::Host, host);
        }
        if let Some(binds) = self.binds {
            if binds.is_empty() {
                return Err(ConfigError::script_parse(origin, "binds must not be empty"));
            }
            for bind in &binds {
                bind.parse::<Bind>().map_err(reject)?;
            }
            source.insert(OptionKey::Binds, binds);
        }
        if let Some(silent) = self.silent {
            source.insert(OptionKey::Silent, silent);
        }
        if let Some(verbose) = self.verbose {
            source.insert(OptionKey::Verbose, verbose);
        }
        if let Some(signals) = self.signals {
            source.insert(OptionKey::Signals, signals);
        }
        if let Some(threads) = self.threads {
            Threads::parse(&threads).map_err(reject)?;
            source.insert(OptionKey::Threads, threads);
        }
        if let Some(environment) = self.environment {
            source.insert(OptionKey::Environment, environment);
        }
        for (name, value) in self.extra {
            let key = OptionKey::from(name);
            if key.is_recognized() {
                return Err(ConfigError::script_parse(
                    origin,
                    format!("{key} belongs at the top level, not in [extra]"),
                ));
            }
            source.insert(key, value);
        }

        Ok(source)
    }
}

/// Conventional script locations under `base_dir`, most specific first.
pub fn conventional_paths(base_dir: &Path, environment: &str) -> [PathBuf; 2] {
    let dir = base_dir.join(SCRIPT_DIR);
    [
        dir.join(SCRIPT_NAME).join(format!("{environment}.toml")),
        dir.join(format!("{SCRIPT_NAME}.toml")),
    ]
}

/// Finds the first existing conventional script.
pub fn locate(base_dir: &Path, environment: &str) -> Option<PathBuf> {
    conventional_paths(base_dir, environment)
        .into_iter()
        .find(|path| path.is_file())
}
