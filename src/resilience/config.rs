use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits for one upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum calls in flight at once.
    pub concurrency: usize,
    /// Length of the trailing window, in milliseconds.
    pub interval_ms: u64,
    /// Maximum grants within one trailing window.
    pub interval_cap: usize,
}

impl RateLimitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            interval_ms: 500,
            interval_cap: 2,
        }
    }
}

/// Upper bound on `max_retries` accepted by configuration validation.
pub const MAX_ATTEMPTS: u32 = 20;

/// Backoff schedule shared by all failure classes that retry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    /// Growth factor between consecutive delays; must be finite and greater than 1.
    pub backoff_multiplier: f64,
    /// Optional ceiling for a single backoff delay.
    pub max_delay_ms: Option<u64>,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay_ms: 20_000,
            backoff_multiplier: 2.0,
            max_delay_ms: None,
        }
    }
}
