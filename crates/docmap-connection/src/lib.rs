//! docmap connection - pool lifecycle and store configuration
//!
//! This crate owns everything between a [`StoreConfig`] and a borrowed
//! connection: the bounded [`ConnectionPool`], the [`PoolManager`] that
//! builds it lazily and tears it down, and the retry policy used while the
//! store is still unreachable.

mod config;
mod manager;
pub mod pool;
pub mod retry;

#[cfg(test)]
mod mock;

pub use config::{
    ENV_ACQUIRE_TIMEOUT_MS, ENV_COLLECTION, ENV_DATABASE, ENV_OPERATION_TIMEOUT_MS,
    ENV_POOL_MAX_SIZE, ENV_POOL_MIN_SIZE, ENV_URI, ENV_WRITE_MODE, StoreConfig, WriteMode,
};
pub use manager::PoolManager;
pub use pool::{ConnectionPool, PoolConfig, PoolStats, PooledConnection};
pub use retry::{BackoffStrategy, RetryConfig};
