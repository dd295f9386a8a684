use std::time::Duration;

use anyhow::Result;

use crate::util::env::env_parse;

/// How often the catalog request is attempted and how long to wait in between.
///
/// The default performs exactly one attempt. Only failures reported as retryable by
/// [`super::FetchError::is_retryable`] are attempted again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::exponential(
            env_parse("SHOPIFY_RETRY_ATTEMPTS", 1u32)?,
            Duration::from_millis(env_parse("SHOPIFY_RETRY_BASE_MS", 500u64)?),
            Duration::from_millis(env_parse("SHOPIFY_RETRY_MAX_MS", 8_000u64)?),
        ))
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after the given failed attempt (1-based): base, 2x base, 4x base, ... capped.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}
