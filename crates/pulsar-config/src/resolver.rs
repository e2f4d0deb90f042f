//! Layered configuration resolution.
//!
//! [`ConfigResolver`] merges any number of [`ConfigSource`]s. For each key
//! the value from the highest [`ConfigLayer`] wins; between two sources on
//! the same layer the one added later wins.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::script::{self, ConfigScript, ScriptFormat};
use crate::{ConfigError, ConfigLayer, ConfigSource, EffectiveConfig, OptionKey, Options};

/// Marker that disables script loading when passed as the only config file.
pub const NO_SCRIPT: &str = "-";

/// Configuration resolver.
///
/// # Example
///
/// ```
/// use pulsar_config::{ConfigResolver, Options};
///
/// let config = ConfigResolver::new()
///     .with_script_string("port = 6001", "toml")
///     .unwrap()
///     .with_options(&Options::new().port(5001).user_supplied_options(["Port"]))
///     .resolve()
///     .unwrap();
///
/// assert_eq!(config.port(), 5001);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    sources: Vec<ConfigSource>,
    scripts: Vec<PathBuf>,
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigResolver {
    /// Creates a resolver seeded with the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: vec![ConfigSource::defaults()],
            scripts: Vec::new(),
        }
    }

    /// Adds a source.
    #[must_use]
    pub fn with_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds caller options as a suggested and an explicit source.
    #[must_use]
    pub fn with_options(self, options: &Options) -> Self {
        let (suggested, explicit) = ConfigSource::from_options(options);
        self.with_source(suggested).with_source(explicit)
    }

    /// Loads a configuration script.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read,
    /// fails to parse or carries invalid values.
    pub fn with_script_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = ConfigScript::load(path)?.into_source(path)?;

        tracing::debug!(path = %path.display(), keys = source.len(), "loaded configuration script");
        self.scripts.push(path.to_path_buf());
        Ok(self.with_source(source))
    }

    /// Loads a configuration script if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be applied.
    pub fn with_optional_script_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_script_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads a script from a string.
    ///
    /// `format` is `"toml"` or `"json"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing or validation fails.
    pub fn with_script_string(self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let origin = PathBuf::from(format!("<string>.{}", format.to_lowercase()));
        let format = ScriptFormat::from_path(&origin)?;
        let source = ConfigScript::parse(content, format, &origin)?.into_source(&origin)?;
        Ok(self.with_source(source))
    }

    /// Merges every source into an [`EffectiveConfig`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidOption` if a recognized key resolves to
    /// a malformed value.
    pub fn resolve(self) -> Result<EffectiveConfig, ConfigError> {
        let mut values: BTreeMap<OptionKey, Value> = BTreeMap::new();
        let mut layers: BTreeMap<OptionKey, ConfigLayer> = BTreeMap::new();

        for source in &self.sources {
            for (key, value) in source.iter() {
                let wins = layers.get(key).map_or(true, |current| source.layer() >= *current);
                if wins {
                    values.insert(key.clone(), value.clone());
                    layers.insert(key.clone(), source.layer());
                }
            }
        }

        let config = EffectiveConfig::from_resolved(values, layers, self.scripts)?;
        tracing::debug!(
            port = config.port(),
            binds = ?config.bind_urls(),
            environment = config.environment(),
            "resolved configuration"
        );
        Ok(config)
    }

    /// Resolves caller options, loading whichever script they select.
    ///
    /// Scripts named by `config_files` are loaded in order and must exist.
    /// Without `config_files` the conventional locations under the base
    /// directory are searched and a missing script is fine.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a script fails to load or a value is invalid.
    pub fn resolve_options(options: &Options) -> Result<EffectiveConfig, ConfigError> {
        let base_dir = match options.base_dir_path() {
            Some(dir) => dir.to_path_buf(),
            None => env::current_dir()?,
        };
        let (suggested, explicit) = ConfigSource::from_options(options);
        let environment = [&explicit, &suggested]
            .into_iter()
            .find_map(|source| source.get(&OptionKey::Environment))
            .and_then(Value::as_str)
            .unwrap_or(crate::DEFAULT_ENVIRONMENT)
            .to_string();

        let mut resolver = Self::new().with_source(suggested);

        match config_files(options)? {
            Some(paths) => {
                for path in paths {
                    resolver = resolver.with_script_file(base_dir.join(path))?;
                }
            }
            None => {
                if let Some(path) = script::locate(&base_dir, &environment) {
                    resolver = resolver.with_script_file(path)?;
                }
            }
        }

        resolver.with_source(explicit).resolve()
    }
}

// `None` means conventional lookup.
fn config_files(options: &Options) -> Result<Option<Vec<PathBuf>>, ConfigError> {
    let invalid = || ConfigError::invalid_option("config_files", "expected a list of paths");

    let paths: Vec<PathBuf> = match options.get(&OptionKey::ConfigFiles) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(path)) => vec![PathBuf::from(path)],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(PathBuf::from).ok_or_else(invalid))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(invalid()),
    };

    if paths.len() == 1 && paths[0] == Path::new(NO_SCRIPT) {
        return Ok(Some(Vec::new()));
    }
    Ok(Some(paths))
}
