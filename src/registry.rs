//! Backend Registry
//!
//! Maps engine names to factories producing fresh, uninitialized backends.
//! The registry is an ordinary value owned by the application's composition
//! root, so tests can build isolated registries.

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use crate::backend::{BackendConfig, CacheBackend};
use crate::error::{CacheError, Result};
use crate::memory::{MemoryBackend, MEMORY_BACKEND};

/// Constructor for a fresh backend instance
///
/// Every call must return an independent instance; factories must not share
/// mutable state between the instances they build.
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn CacheBackend> + Send + Sync>;

/// Name-to-factory mapping
#[derive(Default)]
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, BackendFactory>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every engine shipped in this crate registered
    pub fn with_builtin_backends() -> Self {
        let mut registry = Self::new();
        registry
            .factories
            .get_mut()
            .insert(MEMORY_BACKEND.to_string(), MemoryBackend::factory());
        registry
    }

    /// Register a factory under `name`
    ///
    /// Fails with [`CacheError::DuplicateBackend`] if the name is taken, even
    /// for the same factory.
    pub fn register<F>(&self, name: &str, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn CacheBackend> + Send + Sync + 'static,
    {
        let mut factories = self.factories.write();
        if factories.contains_key(name) {
            return Err(CacheError::DuplicateBackend(name.to_string()));
        }
        factories.insert(name.to_string(), Arc::new(factory));
        debug!(backend = name, "Registered cache backend");
        Ok(())
    }

    /// Factory registered under `name`
    pub fn get(&self, name: &str) -> Result<BackendFactory> {
        self.factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::BackendNotFound(name.to_string()))
    }

    /// Fresh, uninitialized instance of the named backend
    pub fn create(&self, name: &str) -> Result<Box<dyn CacheBackend>> {
        let factory = self.get(name)?;
        Ok(factory())
    }

    /// Construct and initialize the backend named by `config.backend`
    pub async fn open(&self, config: &BackendConfig) -> Result<Arc<dyn CacheBackend>> {
        let mut backend = self.create(&config.backend)?;
        backend.init(config).await?;
        Ok(Arc::from(backend))
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }
}
