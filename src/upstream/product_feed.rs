use super::UpstreamOutcome;
use crate::models::RecordKey;
use async_trait::async_trait;

/// Token-metered product feed used to discover new record keys.
#[async_trait]
pub trait ProductFeed: Send + Sync {
    /// Remaining request tokens on the feed account.
    async fn tokens_left(&self) -> UpstreamOutcome<u64>;

    /// Candidate keys for one source category.
    async fn discover(&self, category: &str) -> UpstreamOutcome<Vec<RecordKey>>;
}
