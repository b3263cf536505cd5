//! Plugin registry
//!
//! The orchestrating layer queries this registry by name to obtain a data
//! source for a run. Registration happens explicitly at startup (the
//! built-in sources) or by library consumers; there is no dynamic discovery
//! of installed packages here.

use std::collections::BTreeMap;

use tracing::debug;

use super::DataSource;

/// Factory capability producing a fresh data source per run
pub type SourceFactory = Box<dyn Fn() -> Box<dyn DataSource> + Send + Sync>;

/// Name-keyed registry of data-source factories
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in sources
    pub fn with_builtin_sources() -> Self {
        let mut registry = Self::new();
        crate::app::sources::register_builtin(&mut registry);
        registry
    }

    /// Register a factory under a plugin name
    ///
    /// A later registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn DataSource> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("registered plugin '{}'", name);
        self.factories.insert(name, Box::new(factory));
    }

    /// Instantiate the data source registered under `name`
    pub fn create(&self, name: &str) -> Option<Box<dyn DataSource>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Whether a plugin name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered plugin names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::plugin::PluginInfo;
    use crate::app::{HostClient, LinkItemCollection};
    use crate::errors::SourceResult;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct NamedSource {
        info: PluginInfo,
    }

    #[async_trait]
    impl DataSource for NamedSource {
        fn info(&self) -> &PluginInfo {
            &self.info
        }

        async fn produce_catalog(
            &self,
            _client: &HostClient,
        ) -> SourceResult<LinkItemCollection> {
            Ok(LinkItemCollection::new())
        }

        async fn produce_freshness_time(
            &self,
            _client: &HostClient,
        ) -> SourceResult<DateTime<Utc>> {
            Ok(crate::app::models::epoch())
        }
    }

    fn named(name: &'static str) -> SourceFactory {
        Box::new(move || {
            Box::new(NamedSource {
                info: PluginInfo::new(name, "0.1.0", "example.com").unwrap(),
            }) as Box<dyn DataSource>
        })
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = PluginRegistry::new();
        registry.register("alpha", named("alpha"));

        assert!(registry.contains("alpha"));
        let source = registry.create("alpha").unwrap();
        assert_eq!(source.info().name(), "alpha");
        assert!(registry.create("beta").is_none());
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = PluginRegistry::new();
        registry.register("beta", named("beta"));
        registry.register("alpha", named("alpha"));

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_builtin_sources_are_registered() {
        let registry = PluginRegistry::with_builtin_sources();
        assert!(registry.contains("demo"));
    }
}
