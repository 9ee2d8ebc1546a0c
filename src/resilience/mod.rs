//! # Resilience Module
//!
//! Throughput control and failure classification for calls to quota-limited upstreams.
//!
//! ## Architecture
//!
//! - **Rate limiting**: one [`RateLimiter`] per upstream service bounds in-flight calls and
//!   grants per trailing interval. It is shared by every caller of that service.
//! - **Retry**: [`RetryPolicy`] classifies each failure by its [`crate::upstream::FailureReason`]
//!   and drives exponential backoff. Backoff state is per call, never shared.
//! - **Guarded calls**: [`GuardedUpstream`] composes the two; every attempt passes through
//!   the limiter.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reconciler_core::resilience::{GuardedUpstream, RateLimitConfig, RetryConfig};
//! use reconciler_core::upstream::UpstreamOutcome;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let marketplace = GuardedUpstream::new(
//!     "marketplace",
//!     RateLimitConfig::default(),
//!     RetryConfig::default(),
//! );
//!
//! let fetched = marketplace
//!     .call(|| async { UpstreamOutcome::Ok(42_u64) })
//!     .await?;
//! assert_eq!(fetched.into_option(), Some(42));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod guarded;
pub mod rate_limiter;
pub mod retry;

pub use config::{RateLimitConfig, RetryConfig, MAX_ATTEMPTS};
pub use guarded::GuardedUpstream;
pub use rate_limiter::{RateLimitPermit, RateLimiter, RateLimiterStats};
pub use retry::{RetryDecision, RetryPolicy, MAX_BACKOFF};
