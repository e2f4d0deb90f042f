//! The resolved configuration.
//!
//! [`EffectiveConfig`] is what the launcher boots from. It is produced once
//! by the [`ConfigResolver`](crate::ConfigResolver) and never mutated.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::{Bind, ConfigError, ConfigLayer, OptionKey};

/// Worker thread bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threads {
    /// Minimum number of threads.
    pub min: usize,
    /// Maximum number of threads.
    pub max: usize,
}

impl Threads {
    /// Parses `"min:max"`, `"max"` or a bare integer.
    pub fn parse(value: &Value) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::invalid_option("Threads", reason);

        let threads = match value {
            Value::Number(n) => Self {
                min: 0,
                max: n
                    .as_u64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| invalid("expected a non-negative integer"))?,
            },
            Value::String(s) => {
                let parse = |part: &str| {
                    part.trim()
                        .parse::<usize>()
                        .map_err(|_| invalid("expected \"min:max\""))
                };
                match s.split_once(':') {
                    Some((min, max)) => Self {
                        min: parse(min)?,
                        max: parse(max)?,
                    },
                    None => Self {
                        min: 0,
                        max: parse(s)?,
                    },
                }
            }
            _ => return Err(invalid("expected \"min:max\"")),
        };

        if threads.max == 0 {
            return Err(invalid("max must be at least 1"));
        }
        if threads.min > threads.max {
            return Err(invalid("min must not exceed max"));
        }

        Ok(threads)
    }
}

impl fmt::Display for Threads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.min, self.max)
    }
}

/// The final, immutable server configuration.
///
/// # Example
///
/// ```
/// use pulsar_config::{ConfigResolver, Options};
///
/// let config = ConfigResolver::new()
///     .with_options(&Options::new())
///     .resolve()
///     .unwrap();
///
/// assert_eq!(config.bind_urls(), vec!["tcp://0.0.0.0:9292"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    values: BTreeMap<OptionKey, Value>,
    layers: BTreeMap<OptionKey, ConfigLayer>,
    port: u16,
    host: String,
    binds: Vec<Bind>,
    silent: bool,
    verbose: bool,
    signals: bool,
    threads: Threads,
    environment: String,
    scripts: Vec<PathBuf>,
}

impl EffectiveConfig {
    /// Validates merged values and derives the bind list.
    pub(crate) fn from_resolved(
        values: BTreeMap<OptionKey, Value>,
        layers: BTreeMap<OptionKey, ConfigLayer>,
        scripts: Vec<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let port = port_value(required(&values, &OptionKey::Port)?)?;
        let host = string_value(&OptionKey::Host, required(&values, &OptionKey::Host)?)?;
        let silent = optional_bool(&values, &OptionKey::Silent)?;
        let verbose = optional_bool(&values, &OptionKey::Verbose)?;
        let signals = optional_bool(&values, &OptionKey::Signals)?;
        let threads = Threads::parse(required(&values, &OptionKey::Threads)?)?;
        let environment = string_value(
            &OptionKey::Environment,
            required(&values, &OptionKey::Environment)?,
        )?;

        // An explicit bind list wins unless a higher layer set the address.
        let address_layer = [OptionKey::Port, OptionKey::Host]
            .iter()
            .filter_map(|key| layers.get(key))
            .max()
            .copied();
        let binds = match (values.get(&OptionKey::Binds), layers.get(&OptionKey::Binds)) {
            (Some(value), Some(layer)) if address_layer.map_or(true, |a| *layer >= a) => {
                bind_list(value)?
            }
            _ => vec![Bind::from_host_port(&host, port)],
        };

        Ok(Self {
            values,
            layers,
            port,
            host,
            binds,
            silent,
            verbose,
            signals,
            threads,
            environment,
            scripts,
        })
    }

    /// The authoritative port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The listen host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The addresses the server will bind, in order.
    pub fn binds(&self) -> &[Bind] {
        &self.binds
    }

    /// The bind list rendered as URLs.
    pub fn bind_urls(&self) -> Vec<String> {
        self.binds.iter().map(ToString::to_string).collect()
    }

    /// Whether status output is suppressed.
    pub fn silent(&self) -> bool {
        self.silent
    }

    /// Whether every request is logged.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Whether SIGINT and SIGTERM stop the server.
    pub fn signals(&self) -> bool {
        self.signals
    }

    /// Worker thread bounds.
    pub fn threads(&self) -> Threads {
        self.threads
    }

    /// Environment name.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Scripts that were loaded, in load order.
    pub fn scripts(&self) -> &[PathBuf] {
        &self.scripts
    }

    /// The last loaded script, if any.
    pub fn script_path(&self) -> Option<&Path> {
        self.scripts.last().map(PathBuf::as_path)
    }

    /// Raw value for any key, including pass-through keys.
    pub fn get(&self, key: &OptionKey) -> Option<&Value> {
        self.values.get(key)
    }

    /// Raw value of an unrecognized key.
    pub fn extra(&self, name: &str) -> Option<&Value> {
        self.values.get(&OptionKey::Other(name.to_string()))
    }

    /// The layer that supplied `key`.
    pub fn layer_of(&self, key: &OptionKey) -> Option<ConfigLayer> {
        self.layers.get(key).copied()
    }
}

fn required<'a>(
    values: &'a BTreeMap<OptionKey, Value>,
    key: &OptionKey,
) -> Result<&'a Value, ConfigError> {
    values
        .get(key)
        .ok_or_else(|| ConfigError::invalid_option(key.as_str(), "no value resolved"))
}

fn port_value(value: &Value) -> Result<u16, ConfigError> {
    let port = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    port.ok_or_else(|| {
        ConfigError::invalid_option("Port", format!("expected an integer port, got {value}"))
    })
}

fn string_value(key: &OptionKey, value: &Value) -> Result<String, ConfigError> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(ConfigError::invalid_option(
            key.as_str(),
            format!("expected a non-empty string, got {value}"),
        )),
    }
}

fn optional_bool(values: &BTreeMap<OptionKey, Value>, key: &OptionKey) -> Result<bool, ConfigError> {
    match values.get(key) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => parse_bool(s).ok_or_else(|| {
            ConfigError::invalid_option(key.as_str(), format!("expected boolean, got {s:?}"))
        }),
        Some(other) => Err(ConfigError::invalid_option(
            key.as_str(),
            format!("expected boolean, got {other}"),
        )),
    }
}

fn bind_list(value: &Value) -> Result<Vec<Bind>, ConfigError> {
    let binds = match value {
        Value::String(s) => vec![s.parse()?],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.parse(),
                other => Err(ConfigError::invalid_option(
                    "Binds",
                    format!("expected a bind URL, got {other}"),
                )),
            })
            .collect::<Result<Vec<Bind>, _>>()?,
        other => {
            return Err(ConfigError::invalid_option(
                "Binds",
                format!("expected a list of bind URLs, got {other}"),
            ))
        }
    };

    if binds.is_empty() {
        return Err(ConfigError::invalid_option("Binds", "must not be empty"));
    }
    Ok(binds)
}

/// Parse a boolean from a string.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
