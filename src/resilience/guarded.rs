use crate::error::UpstreamError;
use crate::resilience::{RateLimitConfig, RateLimiter, RetryConfig, RetryPolicy};
use crate::upstream::{Fetched, UpstreamOutcome};
use std::future::Future;
use std::sync::Arc;

/// One upstream service behind its shared rate limiter and a retry policy.
///
/// Cloning is cheap and every clone shares the limiter, so all workers of all passes that
/// talk to the same service stay inside one budget.
#[derive(Debug, Clone)]
pub struct GuardedUpstream {
    service: Arc<str>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl GuardedUpstream {
    pub fn new(service: &str, limits: RateLimitConfig, retry: RetryConfig) -> Self {
        Self {
            service: Arc::from(service),
            limiter: Arc::new(RateLimiter::new(service, limits)),
            retry: RetryPolicy::new(retry),
        }
    }

    pub fn with_limiter(limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            service: Arc::from(limiter.name()),
            limiter,
            retry,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Call the upstream. Each attempt, retries included, waits for a limiter permit and
    /// holds it until the attempt completes.
    pub async fn call<T, F, Fut>(&self, mut operation: F) -> Result<Fetched<T>, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = UpstreamOutcome<T>>,
    {
        self.retry
            .execute_fallible(&self.service, || {
                let attempt = operation();
                let limiter = Arc::clone(&self.limiter);
                async move {
                    let _permit = limiter.acquire().await?;
                    Ok::<_, UpstreamError>(attempt.await)
                }
            })
            .await
    }
}
