//! Driver registry for managing available store drivers

use std::collections::HashMap;
use std::sync::Arc;

use docmap_core::{DocmapError, Result, StoreDriver, uri_scheme};

/// Registry of available store drivers
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn StoreDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "mongodb")]
        registry.register(Arc::new(crate::mongodb::MongoDbDriver::new()));
        #[cfg(feature = "memory")]
        registry.register(Arc::new(crate::memory::MemoryDriver::new()));

        registry
    }

    /// Register a new driver, replacing any driver with the same id
    pub fn register(&mut self, driver: Arc<dyn StoreDriver>) {
        let id = driver.id().to_string();
        tracing::info!(driver = %id, schemes = ?driver.schemes(), "registering store driver");
        self.drivers.insert(id, driver);
    }

    /// Get a driver by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn StoreDriver>> {
        let driver = self.drivers.get(id).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %id, "driver not found in registry");
        }
        driver
    }

    /// Find the driver handling the scheme of `uri`
    pub fn for_uri(&self, uri: &str) -> Result<Arc<dyn StoreDriver>> {
        let scheme = uri_scheme(uri).ok_or_else(|| {
            DocmapError::Configuration("store URI has no scheme".to_string())
        })?;
        self.drivers
            .values()
            .find(|driver| driver.accepts(uri))
            .cloned()
            .ok_or_else(|| {
                DocmapError::Configuration(format!(
                    "no registered driver handles '{}://' URIs",
                    scheme
                ))
            })
    }

    /// List all registered driver ids
    pub fn list(&self) -> Vec<&str> {
        self.drivers.keys().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
