//! Pool lifecycle management
//!
//! [`PoolManager`] owns the single connection pool for one [`StoreConfig`].
//! The pool is created lazily on the first `connect` (or eagerly with
//! `initialize`), lent out one connection per operation, and torn down with
//! `destroy`.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use docmap_core::{Collection, DocmapError, Namespace, Result, StoreDriver};
use parking_lot::RwLock;

use crate::config::StoreConfig;
use crate::pool::{ConnectionPool, PoolStats, PooledConnection};

/// Owner of the connection pool for one store configuration
///
/// Cloning is not supported; share it behind an `Arc`.
pub struct PoolManager {
    config: StoreConfig,
    namespace: Namespace,
    driver: Arc<dyn StoreDriver>,
    /// The live pool, if one has been initialized
    pool: RwLock<Option<Arc<ConnectionPool>>>,
    /// Serializes initialization so only one pool is ever built at a time
    init_lock: tokio::sync::Mutex<()>,
}

impl PoolManager {
    /// Create a manager for `config`, connecting through `driver`.
    ///
    /// No connection is made here. The configuration is validated, but a
    /// missing URI is only reported by [`PoolManager::initialize`].
    pub fn new(config: StoreConfig, driver: Arc<dyn StoreDriver>) -> Result<Self> {
        config.validate()?;
        let namespace = config.namespace()?;
        Ok(Self {
            config,
            namespace,
            driver,
            pool: RwLock::new(None),
            init_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn driver(&self) -> &Arc<dyn StoreDriver> {
        &self.driver
    }

    /// Build the pool if it does not exist yet, and return it.
    ///
    /// Fails with [`DocmapError::Configuration`] when no URI is configured,
    /// in which case no pool is created. Calling it again while a pool is
    /// live returns the same pool.
    pub async fn initialize(&self) -> Result<Arc<ConnectionPool>> {
        let _guard = self.init_lock.lock().await;
        if let Some(pool) = self.live_pool() {
            return Ok(pool);
        }
        let pool = self.build_pool().await?;
        *self.pool.write() = Some(pool.clone());
        Ok(pool)
    }

    /// Borrow a connection, building the pool first if needed.
    ///
    /// Initialization is retried according to the configured
    /// [`RetryConfig`](crate::RetryConfig); configuration errors fail
    /// immediately. When every connection is lent out the caller waits up to
    /// the pool's acquire timeout and then gets
    /// [`DocmapError::PoolExhausted`].
    pub async fn connect(&self) -> Result<PooledConnection> {
        let pool = match self.live_pool() {
            Some(pool) => pool,
            None => self.initialize_with_retry().await?,
        };
        pool.get().await
    }

    /// Resolve the configured collection on a borrowed connection
    pub fn get_collection(&self, connection: &PooledConnection) -> Result<Box<dyn Collection>> {
        connection.collection(&self.namespace)
    }

    /// Release a collection handle and return its connection to the pool.
    ///
    /// Dropping both values has the same effect; this spells out the order.
    pub fn disconnect(&self, connection: PooledConnection, collection: Box<dyn Collection>) {
        drop(collection);
        connection.release();
    }

    /// Close the pool and forget it.
    ///
    /// Acquisitions still waiting on the old pool fail, idle connections are
    /// closed, and connections still lent out are closed as they come back.
    /// Does nothing when no pool exists. The next `connect` builds a new
    /// pool.
    pub async fn destroy(&self) {
        let _guard = self.init_lock.lock().await;
        let pool = self.pool.write().take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!(
                database = %self.namespace.database(),
                collection = %self.namespace.collection(),
                "connection pool destroyed"
            );
        }
    }

    /// Statistics of the live pool, `None` before initialization
    pub fn stats(&self) -> Option<PoolStats> {
        self.pool.read().as_ref().map(|pool| pool.stats())
    }

    pub fn is_initialized(&self) -> bool {
        self.live_pool().is_some()
    }

    fn live_pool(&self) -> Option<Arc<ConnectionPool>> {
        self.pool
            .read()
            .as_ref()
            .filter(|pool| !pool.is_closed())
            .cloned()
    }

    async fn initialize_with_retry(&self) -> Result<Arc<ConnectionPool>> {
        let _guard = self.init_lock.lock().await;
        if let Some(pool) = self.live_pool() {
            return Ok(pool);
        }
        let pool = self.config.retry().run(|_| self.build_pool()).await?;
        *self.pool.write() = Some(pool.clone());
        Ok(pool)
    }

    async fn build_pool(&self) -> Result<Arc<ConnectionPool>> {
        let uri = match self.config.uri().filter(|uri| !uri.trim().is_empty()) {
            Some(uri) => uri,
            None => {
                tracing::error!("store URI is not set, cannot create connection pool");
                return Err(DocmapError::Configuration(
                    "store URI is not set".to_string(),
                ));
            }
        };

        let factory = self.driver.connector(uri).await?;
        let pool = ConnectionPool::with_factory(self.config.pool().clone(), factory);

        if let Err(e) = pool.warm_up().await {
            tracing::warn!(error = %e, "failed to pre-open pool connections");
        }

        tracing::info!(
            driver = self.driver.id(),
            database = %self.namespace.database(),
            collection = %self.namespace.collection(),
            max_size = self.config.pool().max_size(),
            "connection pool initialized"
        );
        Ok(pool)
    }
}
