use crate::{EngineConfig, Error, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Named engine constructors, selected by a key in an [`EngineConfig`].
///
/// Registration is additive: registering a name twice replaces the earlier
/// factory. Looking up an unknown name is a configuration error.
pub struct Registry<F> {
    kind: &'static str,
    selector: &'static str,
    engines: BTreeMap<String, F>,
}

impl<F> Registry<F> {
    /// `kind` names the registry in error messages, `selector` is the
    /// configuration key holding the engine name.
    pub fn new(kind: &'static str, selector: &'static str) -> Self {
        Self {
            kind,
            selector,
            engines: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, factory: F) -> Option<F> {
        let name = name.into();
        debug!(kind = self.kind, engine = %name, "Registering engine");
        self.engines.insert(name, factory)
    }

    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Result<&F> {
        self.engines.get(name).ok_or_else(|| {
            Error::Config(format!(
                "Unknown {} engine \"{}\" (available: {})",
                self.kind,
                name,
                self.names().join(", ")
            ))
        })
    }

    /// Picks the factory named by the selector key of `config`.
    pub fn resolve(&self, config: &EngineConfig) -> Result<&F> {
        let name = config.optional_str(self.selector)?.ok_or_else(|| {
            Error::Config(format!(
                "No {} engine configured (missing \"{}\")",
                self.kind, self.selector
            ))
        })?;
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry<fn() -> u32> {
        let mut registry: Registry<fn() -> u32> = Registry::new("storage", "engine");
        registry.register("one", || 1);
        registry
    }

    #[test]
    fn test_resolve_uses_selector_key() {
        let registry = registry();
        let config = EngineConfig::new().with("engine", "one");
        assert_eq!((registry.resolve(&config).unwrap())(), 1);
    }

    #[test]
    fn test_later_registration_overwrites() {
        let mut registry = registry();
        assert!(registry.register("one", || 11).is_some());
        assert_eq!((registry.get("one").unwrap())(), 11);
        assert_eq!(registry.names(), vec!["one"]);
    }

    #[test]
    fn test_missing_selector_is_config_error() {
        let err = registry().resolve(&EngineConfig::new()).err().unwrap();
        assert!(err.is_config());
        assert!(err.to_string().contains("No storage engine"));
    }

    #[test]
    fn test_unknown_engine_is_config_error() {
        let config = EngineConfig::new().with("engine", "two");
        let err = registry().resolve(&config).err().unwrap();
        assert!(err.is_config());
        assert!(err.to_string().contains("Unknown storage engine"));
    }
}
