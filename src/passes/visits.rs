use super::{stale_clauses, FanOut};
use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, FieldCondition, FilterDocument, Predicate};
use crate::upstream::{Fetched, MarketplaceClient};
use async_trait::async_trait;
use chrono::Duration;
use tracing::warn;

/// Sums the 30-day visits of every known item of a record.
///
/// A failed item is left out of the sum; the record only fails when no item answered.
pub struct VisitsPass {
    marketplace: MarketplaceClient,
    refresh_after: Duration,
}

impl VisitsPass {
    pub const NAME: &'static str = "visits";

    pub fn new(marketplace: MarketplaceClient, refresh_after: Duration) -> Self {
        Self {
            marketplace,
            refresh_after,
        }
    }
}

#[async_trait]
impl Enricher for VisitsPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predicate(&self, ctx: &PassContext) -> Result<Predicate> {
        Ok(FilterDocument::new()
            .field(Field::ItemIds, FieldCondition::Set)?
            .field(Field::IsMatchCorrect, FieldCondition::eq(true))?
            .any_of(stale_clauses(
                Field::TotalVisitsUpdatedAt,
                ctx.started_at - self.refresh_after,
            ))?
            .into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let mut total = 0_u64;
        let mut fan_out = FanOut::default();

        for item_id in record.item_ids.iter() {
            match self.marketplace.item_visits(item_id).await {
                Ok(Fetched::Value(visits)) => {
                    fan_out.answered += 1;
                    total += visits;
                }
                Ok(Fetched::Empty) => fan_out.answered += 1,
                Err(error) => {
                    warn!(key = %record.key, item_id, error = %error, "Visits lookup failed");
                    fan_out.record_error(error);
                }
            }
        }
        fan_out.into_result()?;

        Ok(Some(MutationDescriptor::for_record(record.key).set(
            FieldUpdate::Visits {
                total,
                at: ctx.started_at,
            },
        )))
    }
}
