use super::matched_catalog;
use crate::aggregation::{ProfitInputs, ProfitPolicy};
use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, Predicate};
use async_trait::async_trait;

/// Recomputes the estimated profit from fields already on the record. No upstream calls;
/// a record whose profit would not change produces no mutation.
pub struct ProfitPass {
    policy: ProfitPolicy,
}

impl ProfitPass {
    pub const NAME: &'static str = "profit";

    pub fn new(policy: ProfitPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Enricher for ProfitPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predicate(&self, _ctx: &PassContext) -> Result<Predicate> {
        Ok(matched_catalog()?
            .any_of(vec![
                Predicate::gt(Field::SourcePrice, 0.0),
                Predicate::eq(Field::Tracking, true),
            ])?
            .into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, _ctx: &PassContext) -> EnrichmentResult {
        let profit = self.policy.estimate(ProfitInputs::from(&record));
        if (profit - record.estimated_profit).abs() < 1e-9 {
            return Ok(None);
        }

        Ok(Some(
            MutationDescriptor::for_record(record.key).set(FieldUpdate::EstimatedProfit(profit)),
        ))
    }
}
