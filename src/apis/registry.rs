use std::sync::Arc;

use super::{EventSource, FeedSource};
use crate::common::error::SourceError;
use crate::config::SourceConfig;

/// Name -> source map built once at startup and passed by reference.
///
/// Keeps insertion order so reports list sources the way config does.
#[derive(Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn EventSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(configs: &[SourceConfig]) -> Result<Self, SourceError> {
        let mut registry = Self::new();
        for config in configs {
            registry.register(Arc::new(FeedSource::new(config.clone())))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, source: Arc<dyn EventSource>) -> Result<(), SourceError> {
        if self.get(source.name()).is_some() {
            return Err(SourceError::Source {
                message: format!("source '{}' is already registered", source.name()),
            });
        }
        self.sources.push(source);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EventSource>> {
        self.sources.iter().find(|s| s.name() == name).cloned()
    }

    /// A registry holding only `name`, for single-source runs
    pub fn only(&self, name: &str) -> Option<SourceRegistry> {
        self.get(name).map(|source| SourceRegistry { sources: vec![source] })
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EventSource>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry").field("sources", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            path: format!("{name}.json").into(),
            timezone: None,
            enabled: true,
        }
    }

    #[test]
    fn test_registry_keeps_config_order() {
        let registry = SourceRegistry::from_config(&[source("zeta"), source("alpha"), source("mid")]).unwrap();
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let result = SourceRegistry::from_config(&[source("a"), source("a")]);
        assert!(matches!(result, Err(SourceError::Source { .. })));
    }

    #[test]
    fn test_only_selects_one_source() {
        let registry = SourceRegistry::from_config(&[source("a"), source("b")]).unwrap();
        assert_eq!(registry.only("b").unwrap().names(), vec!["b"]);
        assert!(registry.only("missing").is_none());
    }
}
