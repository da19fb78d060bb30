//! Exponential backoff for rate-limited completion requests.

use std::time::Duration;

use crate::domain::models::RetryConfig;

/// Backoff schedule: wait `base_wait * factor^attempt` after the
/// rate-limited request with 0-based index `attempt`.
///
/// There is no cap and no jitter; the wait for a given attempt is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Maximum number of requests per invocation
    pub max_attempts: u32,
    pub base_wait: Duration,
    pub factor: u32,
}

impl BackoffPolicy {
    pub const fn new(max_attempts: u32, base_wait: Duration, factor: u32) -> Self {
        Self {
            max_attempts,
            base_wait,
            factor,
        }
    }

    /// Wait that follows a rate limit on request `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.factor
            .checked_pow(attempt)
            .and_then(|multiplier| self.base_wait.checked_mul(multiplier))
            .unwrap_or(Duration::MAX)
    }

    /// Sum of the waits for `n` consecutive rate limits.
    pub fn total_delay(&self, n: u32) -> Duration {
        (0..n).fold(Duration::ZERO, |acc, i| {
            acc.saturating_add(self.delay_for(i))
        })
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.base_wait_secs),
            config.exponential_factor,
        )
    }
}
