//! Caller-supplied options.
//!
//! [`Options`] is the option map a host application passes to the launcher,
//! together with the set of keys it *explicitly* supplied. Keys outside that
//! set are treated as suggestions: a configuration script may override them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// An option key.
///
/// The recognized keys are validated during resolution. Any other name is
/// carried as [`OptionKey::Other`] and passed through opaquely.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    /// Listen port. `0` asks the operating system for an ephemeral port.
    Port,
    /// Listen host, or a unix socket path when it starts with `/` or `.`.
    Host,
    /// Explicit list of bind URLs.
    Binds,
    /// Suppress startup and status output.
    Silent,
    /// Log every request.
    Verbose,
    /// Stop gracefully on SIGINT and SIGTERM.
    Signals,
    /// Worker thread bounds, `"min:max"`.
    Threads,
    /// Environment name.
    Environment,
    /// Explicit configuration script paths.
    ConfigFiles,
    /// Unrecognized key, passed through untouched.
    Other(String),
}

impl OptionKey {
    /// All recognized keys.
    pub const RECOGNIZED: [OptionKey; 9] = [
        Self::Port,
        Self::Host,
        Self::Binds,
        Self::Silent,
        Self::Verbose,
        Self::Signals,
        Self::Threads,
        Self::Environment,
        Self::ConfigFiles,
    ];

    /// Returns the canonical name of the key.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Port => "Port",
            Self::Host => "Host",
            Self::Binds => "Binds",
            Self::Silent => "Silent",
            Self::Verbose => "Verbose",
            Self::Signals => "Signals",
            Self::Threads => "Threads",
            Self::Environment => "environment",
            Self::ConfigFiles => "config_files",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for keys the resolver validates.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for OptionKey {
    fn from(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "port" => Self::Port,
            "host" => Self::Host,
            "binds" => Self::Binds,
            "silent" => Self::Silent,
            "verbose" => Self::Verbose,
            "signals" | "handle_signals" => Self::Signals,
            "threads" => Self::Threads,
            "environment" => Self::Environment,
            "config_files" => Self::ConfigFiles,
            _ => Self::Other(name.to_string()),
        }
    }
}

impl From<String> for OptionKey {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Help text for the options a host is expected to expose.
pub fn valid_options() -> &'static [(&'static str, &'static str)] {
    &[
        ("Host=HOST", "Hostname to listen on (default: 0.0.0.0)"),
        ("Port=PORT", "Port to listen on (default: 9292)"),
        ("Threads=MIN:MAX", "min:max threads to use (default 0:16)"),
        ("Verbose", "Log each request (default: false)"),
        ("Silent", "Suppress status output (default: false)"),
        ("Signals", "Stop gracefully on SIGINT/SIGTERM (default: false)"),
    ]
}

/// Options supplied by the caller.
///
/// # Example
///
/// ```
/// use pulsar_config::{OptionKey, Options};
///
/// let options = Options::new()
///     .port(5001)
///     .user_supplied_options([OptionKey::Port]);
///
/// assert!(options.is_explicit(&OptionKey::Port));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    values: BTreeMap<OptionKey, Value>,
    user_supplied: Option<BTreeSet<OptionKey>>,
    base_dir: Option<PathBuf>,
}

impl Options {
    /// Creates an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option value.
    #[must_use]
    pub fn set(mut self, key: impl Into<OptionKey>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets an option value in place.
    pub fn insert(&mut self, key: impl Into<OptionKey>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Sets an option only if it is not already present.
    pub fn insert_if_absent(&mut self, key: impl Into<OptionKey>, value: impl Into<Value>) {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Removes an option, returning its value.
    pub fn remove(&mut self, key: &OptionKey) -> Option<Value> {
        self.values.remove(key)
    }

    /// Sets the listen port.
    #[must_use]
    pub fn port(self, port: u16) -> Self {
        self.set(OptionKey::Port, port)
    }

    /// Sets the listen host.
    #[must_use]
    pub fn host(self, host: impl Into<String>) -> Self {
        self.set(OptionKey::Host, host.into())
    }

    /// Sets an explicit bind list.
    #[must_use]
    pub fn binds<I, S>(self, binds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let binds: Vec<Value> = binds.into_iter().map(|b| Value::String(b.into())).collect();
        self.set(OptionKey::Binds, binds)
    }

    /// Suppresses status output.
    #[must_use]
    pub fn silent(self, silent: bool) -> Self {
        self.set(OptionKey::Silent, silent)
    }

    /// Enables per-request logging.
    #[must_use]
    pub fn verbose(self, verbose: bool) -> Self {
        self.set(OptionKey::Verbose, verbose)
    }

    /// Makes SIGINT and SIGTERM stop the server.
    #[must_use]
    pub fn signals(self, enabled: bool) -> Self {
        self.set(OptionKey::Signals, enabled)
    }

    /// Sets worker thread bounds as `"min:max"`.
    #[must_use]
    pub fn threads(self, threads: impl Into<String>) -> Self {
        self.set(OptionKey::Threads, threads.into())
    }

    /// Sets the environment name.
    #[must_use]
    pub fn environment(self, environment: impl Into<String>) -> Self {
        self.set(OptionKey::Environment, environment.into())
    }

    /// Names configuration scripts explicitly, replacing the conventional lookup.
    ///
    /// A single `"-"` disables script loading.
    #[must_use]
    pub fn config_files<I, P>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths: Vec<Value> = paths
            .into_iter()
            .map(|p| Value::String(p.as_ref().to_string_lossy().into_owned()))
            .collect();
        self.set(OptionKey::ConfigFiles, paths)
    }

    /// Declares which keys the caller set intentionally.
    ///
    /// Without this call every present key counts as explicit.
    #[must_use]
    pub fn user_supplied_options<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<OptionKey>,
    {
        self.user_supplied = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the directory configuration scripts are looked up from.
    #[must_use]
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Returns the value of an option.
    pub fn get(&self, key: &OptionKey) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns `true` if the option is present.
    pub fn contains(&self, key: &OptionKey) -> bool {
        self.values.contains_key(key)
    }

    /// Returns `true` if the caller explicitly supplied `key`.
    pub fn is_explicit(&self, key: &OptionKey) -> bool {
        match &self.user_supplied {
            Some(keys) => keys.contains(key),
            None => self.values.contains_key(key),
        }
    }

    /// Returns the declared explicit set, if one was given.
    pub fn user_supplied(&self) -> Option<&BTreeSet<OptionKey>> {
        self.user_supplied.as_ref()
    }

    /// Returns the configured base directory, if any.
    pub fn base_dir_path(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Iterates over all option values.
    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &Value)> {
        self.values.iter()
    }
}
