//! # Retry Policy
//!
//! Classifies a failed upstream call by its [`FailureReason`] and decides what happens next.
//!
//! | Reason        | Decision                                                    |
//! |---------------|-------------------------------------------------------------|
//! | `NotFound`    | [`RetryDecision::TreatAsEmpty`], a valid empty result       |
//! | `RateLimited` | retry with exponential backoff until attempts are exhausted |
//! | `Other`       | same schedule as rate limiting                              |
//!
//! Backoff state lives inside a single [`RetryPolicy::execute`] call.

use crate::error::UpstreamError;
use crate::logging::log_upstream_retry;
use crate::resilience::RetryConfig;
use crate::upstream::{FailureReason, Fetched, UpstreamOutcome};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Longest single backoff when the configuration sets no `max_delay_ms`.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    TreatAsEmpty,
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Decide the follow-up for a failure seen on `attempt` (1-based).
    pub fn classify(&self, reason: &FailureReason, attempt: u32) -> RetryDecision {
        match reason {
            FailureReason::NotFound => RetryDecision::TreatAsEmpty,
            FailureReason::RateLimited | FailureReason::Other(_) => {
                if attempt >= self.config.max_retries {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::Retry {
                        delay: self.delay_for_attempt(attempt),
                    }
                }
            }
        }
    }

    /// Backoff after the given failed attempt: `initial * multiplier^(attempt - 1)`, capped
    /// at `max_delay` (or [`MAX_BACKOFF`]). A product that does not fit a `Duration` yields
    /// the cap.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ceiling = self.config.max_delay().unwrap_or(MAX_BACKOFF);
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let seconds =
            self.config.initial_delay().as_secs_f64() * self.config.backoff_multiplier.powi(exponent);

        Duration::try_from_secs_f64(seconds).map_or(ceiling, |delay| delay.min(ceiling))
    }

    /// Run `operation` until it succeeds, reports `NotFound`, or attempts run out.
    pub async fn execute<T, F, Fut>(
        &self,
        service: &str,
        mut operation: F,
    ) -> Result<Fetched<T>, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = UpstreamOutcome<T>>,
    {
        self.execute_fallible(service, || {
            let attempt = operation();
            async move { Ok::<_, UpstreamError>(attempt.await) }
        })
        .await
    }

    /// Like [`execute`](Self::execute), for operations that can fail before reaching the
    /// upstream. Those errors end the call immediately.
    pub(crate) async fn execute_fallible<T, F, Fut>(
        &self,
        service: &str,
        mut operation: F,
    ) -> Result<Fetched<T>, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<UpstreamOutcome<T>, UpstreamError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let reason = match operation().await? {
                UpstreamOutcome::Ok(value) => return Ok(Fetched::Value(value)),
                UpstreamOutcome::Fail(reason) => reason,
            };

            match self.classify(&reason, attempt) {
                RetryDecision::TreatAsEmpty => {
                    debug!(service, attempt, "Upstream reported nothing found");
                    return Ok(Fetched::Empty);
                }
                RetryDecision::Retry { delay } => {
                    log_upstream_retry(
                        service,
                        attempt,
                        &reason.to_string(),
                        delay.as_millis() as u64,
                    );
                    sleep(delay).await;
                }
                RetryDecision::GiveUp => {
                    warn!(
                        service,
                        attempts = attempt,
                        reason = %reason,
                        "❌ Upstream call exhausted its retries"
                    );
                    return Err(UpstreamError::Exhausted {
                        service: service.to_string(),
                        reason,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
