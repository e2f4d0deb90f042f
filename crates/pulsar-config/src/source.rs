//! Configuration sources and their precedence layers.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::{OptionKey, Options};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 9292;

/// Default listen host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default worker thread bounds.
pub const DEFAULT_THREADS: &str = "0:16";

/// Default environment name.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Precedence layer of a [`ConfigSource`], lowest first.
///
/// For every key the value from the highest layer wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigLayer {
    /// Built-in defaults.
    Default,
    /// Caller values the caller did not mark as explicit.
    Suggested,
    /// Values set by the configuration script.
    Script,
    /// Caller values in the explicit set.
    Explicit,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Suggested => "suggested",
            Self::Script => "script",
            Self::Explicit => "explicit",
        };
        f.write_str(name)
    }
}

/// One origin of configuration values.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSource {
    layer: ConfigLayer,
    values: BTreeMap<OptionKey, Value>,
}

impl ConfigSource {
    /// Creates an empty source on the given layer.
    #[must_use]
    pub fn new(layer: ConfigLayer) -> Self {
        Self {
            layer,
            values: BTreeMap::new(),
        }
    }

    /// The built-in defaults.
    #[must_use]
    pub fn defaults() -> Self {
        Self::new(ConfigLayer::Default)
            .with(OptionKey::Port, DEFAULT_PORT)
            .with(OptionKey::Host, DEFAULT_HOST)
            .with(OptionKey::Threads, DEFAULT_THREADS)
            .with(OptionKey::Environment, DEFAULT_ENVIRONMENT)
            .with(OptionKey::Silent, false)
            .with(OptionKey::Verbose, false)
    }

    /// Splits caller options into a suggested and an explicit source.
    ///
    /// Null values are dropped: an option present as `null` is not set.
    #[must_use]
    pub fn from_options(options: &Options) -> (Self, Self) {
        let mut suggested = Self::new(ConfigLayer::Suggested);
        let mut explicit = Self::new(ConfigLayer::Explicit);

        for (key, value) in options.iter() {
            if value.is_null() {
                continue;
            }
            if options.is_explicit(key) {
                explicit.insert(key.clone(), value.clone());
            } else {
                suggested.insert(key.clone(), value.clone());
            }
        }

        (suggested, explicit)
    }

    /// Adds a value, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<OptionKey>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds a value.
    pub fn insert(&mut self, key: impl Into<OptionKey>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the layer of this source.
    pub fn layer(&self) -> ConfigLayer {
        self.layer
    }

    /// Returns the value for `key`, if this source sets it.
    pub fn get(&self, key: &OptionKey) -> Option<&Value> {
        self.values.get(key)
    }

    /// Iterates over the values of this source.
    pub fn iter(&self) -> impl Iterator<Item = (&OptionKey, &Value)> {
        self.values.iter()
    }

    /// Number of keys set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the source sets nothing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
