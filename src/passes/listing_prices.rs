//! Listing price refresh.
//!
//! Selection depends on what the last refresh found:
//!
//! | Current state                                        | Refreshed after      |
//! |------------------------------------------------------|----------------------|
//! | never priced                                         | immediately          |
//! | tracked                                              | tracked refresh      |
//! | price 0, a zero sample within the lookback window    | zero-price interval  |
//! | price 0, a positive sample within the lookback window| listing interval     |
//! | price 0, no known items                              | zero-price interval  |
//! | price > 0                                            | listing interval     |
//!
//! Every refresh appends one history sample and recomputes the windowed averages.

use super::matched_catalog;
use crate::aggregation::TimeSeriesAggregator;
use crate::config::StalenessConfig;
use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, PriceSample, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{CompareOp, Field, Predicate};
use crate::upstream::MarketplaceClient;
use async_trait::async_trait;
use tracing::debug;

pub struct ListingPricesPass {
    marketplace: MarketplaceClient,
    staleness: StalenessConfig,
}

impl ListingPricesPass {
    pub const NAME: &'static str = "listing_prices";

    pub fn new(marketplace: MarketplaceClient, staleness: StalenessConfig) -> Self {
        Self {
            marketplace,
            staleness,
        }
    }

    fn refresh_due(&self, ctx: &PassContext) -> Vec<Predicate> {
        let now = ctx.started_at;
        let listing_cutoff = now - self.staleness.listing_price();
        let zero_cutoff = now - self.staleness.zero_listing_price();
        let lookback = now - self.staleness.price_history_lookback();
        let updated_at = Field::ListingPriceUpdatedAt;

        vec![
            Predicate::is_unset(updated_at),
            Predicate::All(vec![
                Predicate::eq(Field::Tracking, true),
                Predicate::lte(updated_at, now - self.staleness.tracked_refresh()),
            ]),
            Predicate::All(vec![
                Predicate::eq(Field::ListingPrice, 0.0),
                Predicate::HistoryAny {
                    op: CompareOp::Eq,
                    price: 0.0,
                    since: lookback,
                },
                Predicate::lte(updated_at, zero_cutoff),
            ]),
            Predicate::All(vec![
                Predicate::eq(Field::ListingPrice, 0.0),
                Predicate::HistoryAny {
                    op: CompareOp::Gt,
                    price: 0.0,
                    since: lookback,
                },
                Predicate::lte(updated_at, listing_cutoff),
            ]),
            Predicate::All(vec![
                Predicate::eq(Field::ListingPrice, 0.0),
                Predicate::is_unset(Field::ItemIds),
                Predicate::lte(updated_at, zero_cutoff),
            ]),
            Predicate::All(vec![
                Predicate::gt(Field::ListingPrice, 0.0),
                Predicate::lte(updated_at, listing_cutoff),
            ]),
        ]
    }
}

#[async_trait]
impl Enricher for ListingPricesPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predicate(&self, ctx: &PassContext) -> Result<Predicate> {
        Ok(matched_catalog()?.any_of(self.refresh_due(ctx))?.into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let Some(catalog_id) = record.catalog_id.as_deref() else {
            return Ok(None);
        };

        let listings = self
            .marketplace
            .catalog_listings(catalog_id)
            .await?
            .into_option()
            .unwrap_or_default();

        let now = ctx.started_at;
        let price = listings.first().map_or(0.0, |listing| listing.price);
        if listings.is_empty() {
            debug!(key = %record.key, catalog_id, "No active listings for catalog");
        }

        let sample = PriceSample::new(price, now);
        let averages = TimeSeriesAggregator::averages(&record.history_with(sample), now);

        let mut mutation = MutationDescriptor::for_record(record.key.clone())
            .set(FieldUpdate::ListingPrice { price, at: now })
            .set(FieldUpdate::PriceAverages {
                last_30d: averages.last_30d,
                last_90d: averages.last_90d,
                last_180d: averages.last_180d,
            })
            .append_history(sample);
        if !listings.is_empty() {
            mutation = mutation.set(FieldUpdate::MergeItemIds(
                listings.into_iter().map(|listing| listing.item_id).collect(),
            ));
        }
        Ok(Some(mutation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::{ctx, record, start, FakeMarketplace};
    use chrono::Duration;

    fn matched(key: &str) -> ProductMapping {
        let mut r = record(key);
        r.catalog_id = Some(format!("MLM-{key}"));
        r
    }

    fn pass() -> ListingPricesPass {
        let (_, client) = FakeMarketplace::default().into_client();
        ListingPricesPass::new(client, StalenessConfig::default())
    }

    #[tokio::test]
    async fn first_listing_sets_price_items_and_history() {
        let (_, client) = FakeMarketplace::default()
            .with_listings("MLM-B01", &[("MLM1", 300.0), ("MLM2", 320.0)])
            .into_client();
        let pass = ListingPricesPass::new(client, StalenessConfig::default());

        let mut r = matched("B01");
        r.price_history
            .push(PriceSample::new(100.0, start() - Duration::days(10)));

        let mutation = pass.enrich(r.clone(), &ctx("prices")).await.unwrap().unwrap();
        r.apply(&mutation);

        assert_eq!(r.listing_price, 300.0);
        assert_eq!(r.listing_price_updated_at, Some(start()));
        assert_eq!(r.item_ids.as_slice(), &["MLM1", "MLM2"]);
        assert_eq!(r.price_history.len(), 2);
        assert_eq!(r.average_price_30d, 200.0);
    }

    #[tokio::test]
    async fn averages_match_history_when_sample_is_out_of_order() {
        let (_, client) = FakeMarketplace::default()
            .with_listings("MLM-B07", &[("MLM1", 900.0)])
            .into_client();
        let pass = ListingPricesPass::new(client, StalenessConfig::default());

        let mut r = matched("B07");
        r.price_history.extend([
            PriceSample::new(100.0, start() - Duration::days(10)),
            PriceSample::new(200.0, start() + Duration::hours(1)),
        ]);
        let stored = r.price_history.clone();

        let mutation = pass.enrich(r.clone(), &ctx("prices")).await.unwrap().unwrap();
        r.apply(&mutation);

        assert_eq!(r.price_history, stored);
        assert_eq!(r.listing_price, 900.0);
        let expected = TimeSeriesAggregator::averages(&r.price_history, start());
        assert_eq!(r.average_price_30d, expected.last_30d);
        assert_eq!(r.average_price_90d, expected.last_90d);
        assert_eq!(r.average_price_180d, expected.last_180d);
    }

    #[tokio::test]
    async fn no_listings_records_a_zero_sample() {
        let (_, client) = FakeMarketplace::default().into_client();
        let pass = ListingPricesPass::new(client, StalenessConfig::default());

        let mut r = matched("B02");
        let mutation = pass.enrich(r.clone(), &ctx("prices")).await.unwrap().unwrap();
        r.apply(&mutation);

        assert_eq!(r.listing_price, 0.0);
        assert_eq!(r.listing_price_updated_at, Some(start()));
        assert_eq!(r.price_history, vec![PriceSample::new(0.0, start())]);
        assert!(r.item_ids.is_empty());
    }

    #[test]
    fn zero_price_with_recent_zero_sample_waits_five_days() {
        let predicate = pass().predicate(&ctx("prices")).unwrap();

        let mut r = matched("B03");
        r.item_ids.insert("MLM1");
        r.listing_price_updated_at = Some(start() - Duration::days(2));
        r.price_history
            .push(PriceSample::new(0.0, start() - Duration::days(2)));
        assert!(!predicate.matches(&r));

        r.listing_price_updated_at = Some(start() - Duration::days(6));
        assert!(predicate.matches(&r));
    }

    #[test]
    fn zero_price_after_recent_positive_sample_waits_one_day() {
        let predicate = pass().predicate(&ctx("prices")).unwrap();

        let mut r = matched("B04");
        r.item_ids.insert("MLM1");
        r.price_history
            .push(PriceSample::new(250.0, start() - Duration::days(3)));
        r.listing_price_updated_at = Some(start() - Duration::hours(25));

        assert!(predicate.matches(&r));
    }

    #[test]
    fn positive_price_refreshes_daily_and_tracked_hourly() {
        let predicate = pass().predicate(&ctx("prices")).unwrap();

        let mut r = matched("B05");
        r.listing_price = 199.0;
        r.listing_price_updated_at = Some(start() - Duration::hours(2));
        assert!(!predicate.matches(&r));

        r.tracking = true;
        assert!(predicate.matches(&r));

        r.listing_price_updated_at = Some(start() - Duration::minutes(30));
        assert!(!predicate.matches(&r));
    }

    #[test]
    fn wrong_matches_are_excluded() {
        let predicate = pass().predicate(&ctx("prices")).unwrap();
        let mut r = matched("B06");
        assert!(predicate.matches(&r));

        r.is_match_correct = false;
        assert!(!predicate.matches(&r));
    }
}
