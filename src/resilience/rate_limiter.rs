//! # Rate Limiter
//!
//! Bounds both the concurrency and the rate of calls to one upstream service.
//!
//! A caller proceeds past [`RateLimiter::acquire`] only when fewer than `concurrency`
//! permits are held AND fewer than `interval_cap` permits were granted within the trailing
//! `interval`. The concurrency slot is an owned semaphore permit, so it is released when
//! the [`RateLimitPermit`] drops: on success, on error, and while unwinding from a panic.

use crate::error::UpstreamError;
use crate::resilience::RateLimitConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Proof of admission. Dropping it frees the concurrency slot.
#[derive(Debug)]
pub struct RateLimitPermit {
    _slot: OwnedSemaphorePermit,
    granted_at: Instant,
}

impl RateLimitPermit {
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub in_flight: usize,
    pub granted: u64,
    /// Grants that had to wait for the trailing window to open.
    pub delayed: u64,
}

#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    config: RateLimitConfig,
    slots: Arc<Semaphore>,
    /// Grant instants inside the trailing window, oldest first.
    grants: Mutex<VecDeque<Instant>>,
    granted: AtomicU64,
    delayed: AtomicU64,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimitConfig) -> Self {
        let name = name.into();
        info!(
            service = %name,
            concurrency = config.concurrency,
            interval_ms = config.interval_ms,
            interval_cap = config.interval_cap,
            "🚦 Rate limiter initialized"
        );

        Self {
            slots: Arc::new(Semaphore::new(config.concurrency)),
            grants: Mutex::new(VecDeque::with_capacity(config.interval_cap)),
            granted: AtomicU64::new(0),
            delayed: AtomicU64::new(0),
            name,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait until both bounds allow one more call.
    pub async fn acquire(&self) -> Result<RateLimitPermit, UpstreamError> {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| UpstreamError::LimiterClosed {
                service: self.name.clone(),
            })?;

        let mut waited = false;
        loop {
            match self.try_grant() {
                Ok(granted_at) => {
                    self.granted.fetch_add(1, Ordering::Relaxed);
                    if waited {
                        self.delayed.fetch_add(1, Ordering::Relaxed);
                    }
                    return Ok(RateLimitPermit {
                        _slot: slot,
                        granted_at,
                    });
                }
                Err(wait) => {
                    waited = true;
                    debug!(
                        service = %self.name,
                        wait_ms = wait.as_millis() as u64,
                        "Interval cap reached, waiting for window"
                    );
                    sleep(wait).await;
                }
            }
        }
    }

    /// Run `operation` under a permit. The permit is held for the whole call.
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T, UpstreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(operation().await)
    }

    /// Stop admitting callers. Waiting and future `acquire` calls fail.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            in_flight: self.config.concurrency - self.slots.available_permits(),
            granted: self.granted.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
        }
    }

    /// Record a grant now, or report how long until the oldest grant leaves the window.
    fn try_grant(&self) -> Result<Instant, Duration> {
        let interval = self.config.interval();
        let now = Instant::now();
        let mut grants = self.grants.lock();

        while let Some(oldest) = grants.front() {
            if now.saturating_duration_since(*oldest) >= interval {
                grants.pop_front();
            } else {
                break;
            }
        }

        if grants.len() < self.config.interval_cap {
            grants.push_back(now);
            return Ok(now);
        }

        let oldest = grants.front().copied().unwrap_or(now);
        Err((oldest + interval).saturating_duration_since(now))
    }
}
