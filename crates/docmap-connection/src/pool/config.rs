//! Pool configuration types

use std::time::Duration;

use docmap_core::{DocmapError, Result};
use serde::{Deserialize, Serialize};

/// Sizing and timing of a connection pool.
///
/// Sizes are not checked on construction. [`PoolConfig::validate`] rejects
/// a zero `max_size` or a `min_size` above it, and runs whenever a
/// [`PoolManager`](crate::PoolManager) is built. Use [`PoolConfig::try_new`]
/// to check up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Connections opened when the pool is first built
    min_size: usize,
    /// Upper bound on connections lent out at once
    max_size: usize,
    /// How long `get` waits for a free slot
    acquire_timeout_ms: u64,
    /// Idle connections older than this are closed instead of reused
    idle_timeout_ms: u64,
    /// Connections older than this are replaced, if set
    max_lifetime_ms: Option<u64>,
}

const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 600_000;

impl PoolConfig {
    /// Pool of `min_size` warm and at most `max_size` lent connections
    pub fn new(min_size: usize, max_size: usize) -> Self {
        Self {
            min_size,
            max_size,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            max_lifetime_ms: None,
        }
    }

    /// Like [`PoolConfig::new`], but fails with
    /// [`DocmapError::Configuration`] on invalid sizes.
    pub fn try_new(min_size: usize, max_size: usize) -> Result<Self> {
        let config = Self::new(min_size, max_size);
        config.validate()?;
        Ok(config)
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle timeout in milliseconds
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum connection lifetime in milliseconds
    pub fn with_max_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.max_lifetime_ms = Some(lifetime_ms);
        self
    }

    /// Check the sizing invariants
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(DocmapError::Configuration(
                "pool max_size must be greater than 0".to_string(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(DocmapError::Configuration(format!(
                "pool min_size ({}) cannot exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }

    /// Get the minimum pool size
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the acquire timeout as a Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get the idle timeout as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Get the maximum lifetime as a Duration if set
    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_ms.map(Duration::from_millis)
    }

    pub(crate) fn set_min_size(&mut self, min_size: usize) {
        self.min_size = min_size;
    }

    pub(crate) fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
    }
}

impl Default for PoolConfig {
    /// No warm connections, up to 10 lent, 30s acquire and 10min idle timeouts
    fn default() -> Self {
        Self::new(0, 10)
    }
}
