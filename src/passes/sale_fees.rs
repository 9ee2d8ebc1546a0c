//! Sale commission lookup with a per-pass category fee cache.

use crate::config::MarketplaceConfig;
use crate::error::{Result, UpstreamError};
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, FieldCondition, FilterDocument, Predicate};
use crate::upstream::{FeeQuery, MarketplaceClient};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Category → commission rate. Each key is written once; there is no eviction, so the
/// cache must not outlive the pass run it was created for.
#[derive(Debug, Default)]
pub struct FeeCache {
    rates: DashMap<String, f64>,
}

impl FeeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category_id: &str) -> Option<f64> {
        self.rates.get(category_id).map(|rate| *rate)
    }

    /// Store `rate` unless another worker got there first; returns the cached rate.
    pub fn insert(&self, category_id: &str, rate: f64) -> f64 {
        *self
            .rates
            .entry(category_id.to_string())
            .or_insert(rate)
            .value()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

pub struct SaleFeesPass {
    marketplace: MarketplaceClient,
    settings: MarketplaceConfig,
    cache: Arc<FeeCache>,
}

impl SaleFeesPass {
    pub const NAME: &'static str = "sale_fees";

    pub fn new(
        marketplace: MarketplaceClient,
        settings: MarketplaceConfig,
        cache: Arc<FeeCache>,
    ) -> Self {
        Self {
            marketplace,
            settings,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<FeeCache> {
        &self.cache
    }

    async fn commission_rate(&self, category_id: &str) -> std::result::Result<f64, UpstreamError> {
        if let Some(rate) = self.cache.get(category_id) {
            return Ok(rate);
        }

        let query = FeeQuery {
            category_id: category_id.to_string(),
            price: self.settings.fee_reference_price,
            listing_type: self.settings.listing_type.clone(),
        };
        let rate = self
            .marketplace
            .listing_fee(&query)
            .await?
            .into_option()
            .map_or(0.0, |fee| fee.rate());

        debug!(category_id, rate, "Cached category commission");
        Ok(self.cache.insert(category_id, rate))
    }
}

#[async_trait]
impl Enricher for SaleFeesPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predicate(&self, _ctx: &PassContext) -> Result<Predicate> {
        Ok(FilterDocument::new()
            .field(Field::CategoryId, FieldCondition::Set)?
            .field(Field::SaleCommissionUpdatedAt, FieldCondition::Unset)?
            .into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let Some(category_id) = record.category_id.as_deref() else {
            return Ok(None);
        };
        let rate = self.commission_rate(category_id).await?;

        Ok(Some(MutationDescriptor::for_record(record.key).set(
            FieldUpdate::SaleCommission {
                rate,
                at: ctx.started_at,
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::{ctx, record, start, FakeMarketplace};

    fn categorized(key: &str, category_id: &str) -> ProductMapping {
        let mut r = record(key);
        r.category_id = Some(category_id.to_string());
        r
    }

    fn fees_pass(client: MarketplaceClient) -> SaleFeesPass {
        SaleFeesPass::new(client, MarketplaceConfig::default(), Arc::new(FeeCache::new()))
    }

    #[tokio::test]
    async fn fee_is_fetched_once_per_category() {
        let (fake, client) = FakeMarketplace::default()
            .with_fee("MLM1234", 16.5)
            .into_client();
        let pass = fees_pass(client);

        for key in ["B01", "B02", "B03"] {
            let mutation = pass
                .enrich(categorized(key, "MLM1234"), &ctx("fees"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(
                mutation.updates,
                vec![FieldUpdate::SaleCommission {
                    rate: 0.165,
                    at: start()
                }]
            );
        }

        assert_eq!(fake.calls(), 1);
        let queries = fake.fee_queries.lock();
        assert_eq!(queries[0].price, 499.0);
        assert_eq!(queries[0].listing_type, "gold_special");
    }

    #[tokio::test]
    async fn unknown_fee_is_written_as_zero() {
        let (_, client) = FakeMarketplace::default().into_client();
        let pass = fees_pass(client);

        let mut r = categorized("B04", "MLM0000");
        let mutation = pass.enrich(r.clone(), &ctx("fees")).await.unwrap().unwrap();
        r.apply(&mutation);

        assert_eq!(r.sale_commission, 0.0);
        assert_eq!(r.sale_commission_updated_at, Some(start()));
        assert_eq!(pass.cache().get("MLM0000"), Some(0.0));
    }

    #[tokio::test]
    async fn failed_lookup_is_not_cached() {
        let (_, client) = FakeMarketplace::default().failing_on("MLM5555").into_client();
        let pass = fees_pass(client);

        assert!(pass.enrich(categorized("B05", "MLM5555"), &ctx("fees")).await.is_err());
        assert!(pass.cache().is_empty());
    }

    #[test]
    fn first_insert_wins() {
        let cache = FeeCache::new();
        assert_eq!(cache.insert("MLM1", 0.12), 0.12);
        assert_eq!(cache.insert("MLM1", 0.20), 0.12);
        assert_eq!(cache.len(), 1);
    }
}
