//! Bounded retry policy for pool initialization
//!
//! The first `connect` builds the pool. When the driver cannot reach the
//! store yet, initialization is retried a bounded number of times with
//! exponential backoff instead of spinning.

mod backoff;


use std::future::Future;

use docmap_core::{DocmapError, Result};
use serde::{Deserialize, Serialize};

pub use backoff::BackoffStrategy;

/// How often, and how patiently, a failed initialization is retried
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one (at least 1)
    max_attempts: u32,
    /// Delay schedule between attempts
    backoff: BackoffStrategy,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self::new(1, BackoffStrategy::default())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// Whether `error` is worth another attempt.
    ///
    /// Configuration and namespace errors never fix themselves.
    pub fn should_retry(&self, error: &DocmapError) -> bool {
        error.is_transient()
    }

    /// Run `operation` until it succeeds, fails permanently or the attempts
    /// are used up. The last error is returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < max_attempts && self.should_retry(&err) => {
                    let delay = self.backoff.calculate_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryConfig {
    /// Three attempts with the default backoff
    fn default() -> Self {
        Self::new(3, BackoffStrategy::default())
    }
}
