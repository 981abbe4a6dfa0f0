//! Exponential backoff between pool initialization attempts

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff strategy.
///
/// Delays grow by `multiplier` with each attempt, capped at `max_ms`.
///
/// ```
/// use docmap_connection::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(100, 1_000);
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(100));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(200));
/// assert_eq!(backoff.calculate_delay(10), Duration::from_millis(1_000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffStrategy {
    /// Delay before the first retry, in milliseconds
    initial_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    max_ms: u64,
    /// Growth factor applied per attempt
    multiplier: f64,
}

impl BackoffStrategy {
    /// Create a backoff strategy doubling from `initial_ms` up to `max_ms`
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
        }
    }

    /// Set the growth factor. Values below 1.0 are clamped to 1.0.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Delay before retry number `attempt` (zero-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = (self.initial_ms as f64) * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis(delay_ms.min(self.max_ms as f64) as u64)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Default for BackoffStrategy {
    /// 100ms initial delay, capped at 5 seconds
    fn default() -> Self {
        Self::new(100, 5_000)
    }
}
