//! Handler lookup by name.
//!
//! Host frameworks pick a server by name, e.g. from a `--server` flag.
//! Lookup is case-insensitive, so `"pulsar"` and `"Pulsar"` resolve to the
//! same handler.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use pulsar_config::Options;
use pulsar_server::{Launcher, ReadyEvent, SharedApp};

use crate::{Error, Result};

/// Name the built-in handler is registered under.
pub const HANDLER_NAME: &str = "pulsar";

/// Readiness callback accepted by [`Handler::run`].
pub type ReadyCallback = Box<dyn FnOnce(&Launcher, &ReadyEvent) + Send>;

/// A server that can run an application.
pub trait Handler: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    /// Help text for the options this handler understands.
    fn valid_options(&self) -> &'static [(&'static str, &'static str)];

    /// Serves `app` until stopped. See [`crate::run`].
    fn run(&self, app: SharedApp, options: Options, on_ready: ReadyCallback) -> Result<()>;
}

/// The Pulsar handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulsarHandler;

impl Handler for PulsarHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn valid_options(&self) -> &'static [(&'static str, &'static str)] {
        crate::valid_options()
    }

    fn run(&self, app: SharedApp, options: Options, on_ready: ReadyCallback) -> Result<()> {
        crate::run(app, options, on_ready)
    }
}

/// Handlers by lowercase name.
///
/// # Example
///
/// ```
/// use pulsar::HandlerRegistry;
///
/// let registry = HandlerRegistry::default();
/// let handler = registry.get("Pulsar").unwrap();
/// assert_eq!(handler.name(), "pulsar");
/// ```
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Registers `handler` under its name, replacing any previous entry.
    pub fn register(&mut self, handler: impl Handler + 'static) -> &mut Self {
        let name = handler.name().to_lowercase();
        tracing::debug!(handler = %name, "registered handler");
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    /// Looks up a handler, ignoring case.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&name.to_lowercase()).cloned()
    }

    /// Looks up a handler, failing with [`Error::UnknownHandler`].
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Handler>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownHandler(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl Default for HandlerRegistry {
    /// A registry holding the Pulsar handler.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(PulsarHandler);
        registry
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Handler for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn valid_options(&self) -> &'static [(&'static str, &'static str)] {
            &[]
        }

        fn run(&self, _app: SharedApp, _options: Options, _on_ready: ReadyCallback) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = HandlerRegistry::default();
        let lower = registry.get("pulsar").unwrap();
        let upper = registry.get("Pulsar").unwrap();

        assert!(Arc::ptr_eq(&lower, &upper));
        assert!(registry.get("PULSAR").is_some());
    }

    #[test]
    fn test_unknown_handler() {
        let registry = HandlerRegistry::default();
        assert!(registry.get("webrick").is_none());
        assert!(matches!(
            registry.resolve("webrick"),
            Err(Error::UnknownHandler(name)) if name == "webrick"
        ));
    }

    #[test]
    fn test_register_additional_handler() {
        let mut registry = HandlerRegistry::default();
        registry.register(Named("Falcon"));

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["falcon", "pulsar"]);
        assert_eq!(registry.get("FALCON").unwrap().name(), "Falcon");
    }

    #[test]
    fn test_empty_registry() {
        assert!(HandlerRegistry::empty().get("pulsar").is_none());
    }

    #[test]
    fn test_pulsar_handler_options() {
        let handler = PulsarHandler;
        assert!(handler
            .valid_options()
            .iter()
            .any(|(name, _)| name.starts_with("Port")));
    }
}
