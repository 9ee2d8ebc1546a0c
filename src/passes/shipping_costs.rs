use super::{matched_catalog, stale_clauses, FanOut};
use crate::config::MarketplaceConfig;
use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, FieldCondition, Predicate};
use crate::upstream::{Fetched, MarketplaceClient, ShippingOption};
use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShippingSchedule {
    /// Records whose shipping cost was never fetched.
    Daily,
    /// Records with known items whose shipping cost is older than the interval.
    Monthly { refresh_after: Duration },
}

/// Shipping cost from the first item that has shipping options to the configured zip code.
///
/// The standard option's list cost is used when it has a positive base cost; otherwise,
/// and for records without items, the default shipping cost is written.
pub struct ShippingCostsPass {
    marketplace: MarketplaceClient,
    settings: MarketplaceConfig,
    default_cost: f64,
    schedule: ShippingSchedule,
}

impl ShippingCostsPass {
    pub const DAILY: &'static str = "shipping_costs_daily";
    pub const MONTHLY: &'static str = "shipping_costs_monthly";

    pub fn new(
        marketplace: MarketplaceClient,
        settings: MarketplaceConfig,
        default_cost: f64,
        schedule: ShippingSchedule,
    ) -> Self {
        Self {
            marketplace,
            settings,
            default_cost,
            schedule,
        }
    }

    fn standard_cost(&self, options: &[ShippingOption]) -> Option<f64> {
        options
            .iter()
            .find(|option| {
                option.name.contains(&self.settings.standard_shipping_label)
                    && option.base_cost > 0.0
            })
            .map(|option| option.list_cost)
    }
}

#[async_trait]
impl Enricher for ShippingCostsPass {
    fn name(&self) -> &str {
        match self.schedule {
            ShippingSchedule::Daily => Self::DAILY,
            ShippingSchedule::Monthly { .. } => Self::MONTHLY,
        }
    }

    fn predicate(&self, ctx: &PassContext) -> Result<Predicate> {
        let document = match self.schedule {
            ShippingSchedule::Daily => {
                matched_catalog()?.field(Field::ShippingCostUpdatedAt, FieldCondition::Unset)?
            }
            ShippingSchedule::Monthly { refresh_after } => matched_catalog()?
                .field(Field::ItemIds, FieldCondition::Set)?
                .any_of(stale_clauses(
                    Field::ShippingCostUpdatedAt,
                    ctx.started_at - refresh_after,
                ))?,
        };
        Ok(document.into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let mut cost = self.default_cost;
        let mut fan_out = FanOut::default();

        for item_id in record.item_ids.iter() {
            match self
                .marketplace
                .shipping_options(item_id, &self.settings.zip_code)
                .await
            {
                Ok(Fetched::Value(options)) if !options.is_empty() => {
                    fan_out.answered += 1;
                    cost = self.standard_cost(&options).unwrap_or(self.default_cost);
                    break;
                }
                Ok(_) => {
                    debug!(key = %record.key, item_id, "Item has no shipping options");
                    fan_out.answered += 1;
                }
                Err(error) => {
                    warn!(key = %record.key, item_id, error = %error, "Shipping lookup failed");
                    fan_out.record_error(error);
                }
            }
        }
        fan_out.into_result()?;

        Ok(Some(MutationDescriptor::for_record(record.key).set(
            FieldUpdate::ShippingCost {
                cost,
                at: ctx.started_at,
            },
        )))
    }
}
