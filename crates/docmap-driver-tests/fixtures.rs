//! Core test fixtures for running the same document tests against every
//! store backend.
//!
//! Tests name a [`TestBackend`] and receive a fresh [`DocumentStore`] bound
//! to a collection nobody else uses, so they can run in parallel without
//! cleaning up after each other.
//!
//! The memory backend is always available. MongoDB is reached through the
//! URI in `DOCMAP_TEST_MONGODB_URI` when it is set, otherwise a container is
//! started with testcontainers-rs. When neither works (no Docker daemon) the
//! MongoDB cases are skipped with a warning.
//!
//! # Usage
//!
//! ```rust,ignore
//! use docmap_driver_tests::fixtures::{TestBackend, test_store};
//! use rstest::rstest;
//!
//! #[rstest]
//! #[case::memory(TestBackend::Memory)]
//! #[case::mongodb(TestBackend::MongoDb)]
//! #[tokio::test]
//! async fn test_commit(#[case] backend: TestBackend) -> anyhow::Result<()> {
//!     let Some(store) = test_store(backend).await? else {
//!         return Ok(());
//!     };
//!     store.commit(&OrderedMap::from([("k", "v")])).await?;
//!     Ok(())
//! }
//! ```

use std::env;

use anyhow::{Context, Result};
use docmap_connection::{BackoffStrategy, PoolConfig, RetryConfig, StoreConfig};
use docmap_core::oid::generate_oid;
use docmap_drivers::DriverRegistry;
use docmap_store::DocumentStore;
use once_cell::sync::Lazy;

use crate::test_containers::mongodb_container;

/// Environment variable naming an already running MongoDB server
pub const MONGODB_URI_VAR: &str = "DOCMAP_TEST_MONGODB_URI";

/// Database every test collection is created in
pub const TEST_DATABASE: &str = "docmap_tests";

/// Store backend identifier for parameterized testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestBackend {
    /// In-process memory driver
    Memory,
    /// A real MongoDB server
    MongoDb,
}

impl TestBackend {
    /// Driver id handling this backend
    pub fn name(&self) -> &'static str {
        match self {
            TestBackend::Memory => "memory",
            TestBackend::MongoDb => "mongodb",
        }
    }

    /// Whether the backend needs an external server
    pub fn is_external(&self) -> bool {
        matches!(self, TestBackend::MongoDb)
    }
}

/// Shared registry, so every memory store URI resolves to the same driver
static REGISTRY: Lazy<DriverRegistry> = Lazy::new(DriverRegistry::with_defaults);

/// The process-wide driver registry used by the fixtures
pub fn registry() -> &'static DriverRegistry {
    &REGISTRY
}

/// A collection name no other test uses
pub fn unique_collection(prefix: &str) -> String {
    format!("{}_{}", prefix, generate_oid().to_hex())
}

/// Store URI for `backend`, or `None` when the backend is unavailable
pub async fn backend_uri(backend: TestBackend) -> Option<String> {
    match backend {
        TestBackend::Memory => Some("memory://driver-tests".to_string()),
        TestBackend::MongoDb => {
            if let Ok(uri) = env::var(MONGODB_URI_VAR) {
                if !uri.trim().is_empty() {
                    return Some(uri);
                }
            }
            match mongodb_container().await {
                Ok(info) => Some(info.uri()),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "MongoDB unavailable, skipping (set {} or start Docker)",
                        MONGODB_URI_VAR
                    );
                    None
                }
            }
        }
    }
}

/// Base configuration for a fresh collection on `backend`
pub async fn test_config(backend: TestBackend) -> Option<StoreConfig> {
    let uri = backend_uri(backend).await?;
    Some(
        StoreConfig::new(uri)
            .with_database(TEST_DATABASE)
            .with_collection(unique_collection(backend.name()))
            .with_pool(PoolConfig::new(0, 4).with_acquire_timeout_ms(5_000))
            .with_retry(RetryConfig::new(3, BackoffStrategy::new(50, 500)))
            .with_operation_timeout_ms(10_000),
    )
}

/// Build a store from `config` through the shared registry
pub fn store_for(config: StoreConfig) -> Result<DocumentStore> {
    DocumentStore::from_config(config, registry()).context("failed to build document store")
}

/// Create a store on a fresh collection for `backend`.
///
/// Returns `Ok(None)` when the backend cannot be reached, so callers can
/// skip instead of failing.
pub async fn test_store(backend: TestBackend) -> Result<Option<DocumentStore>> {
    initialize_logging();

    let Some(config) = test_config(backend).await else {
        return Ok(None);
    };
    let store = store_for(config)?;

    tracing::debug!(
        backend = %backend.name(),
        collection = %store.manager().namespace().collection(),
        "test store ready"
    );
    Ok(Some(store))
}

/// Returns every backend
pub fn all_backends() -> Vec<TestBackend> {
    vec![TestBackend::Memory, TestBackend::MongoDb]
}

/// Initialize logging for tests if not already initialized
fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let mut filter = tracing_subscriber::EnvFilter::from_default_env();
        for directive in ["docmap=debug", "docmap_driver_tests=debug"] {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
