use super::{matched_catalog, stale_clauses};
use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, FieldCondition, FilterDocument, Predicate};
use crate::upstream::{ProductOffers, SourceCatalogClient};
use async_trait::async_trait;
use chrono::Duration;
use tracing::debug;

/// Which records a source price pass refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePriceSelection {
    /// Matched, untracked records with enough marketplace demand.
    Untracked {
        min_visits: u64,
        refresh_after: Duration,
    },
    /// Records on the watch list, on their own refresh interval.
    Tracked { refresh_after: Duration },
}

/// Lowest price offered by an accepted seller, buy box included.
///
/// When no accepted seller offers the product, the price and the estimated profit are
/// both written as zero.
pub struct SourcePricesPass {
    source_catalog: SourceCatalogClient,
    accepted_sellers: Vec<String>,
    selection: SourcePriceSelection,
}

impl SourcePricesPass {
    pub const UNTRACKED: &'static str = "source_prices";
    pub const TRACKED: &'static str = "tracked_source_prices";

    pub fn new(
        source_catalog: SourceCatalogClient,
        accepted_sellers: Vec<String>,
        selection: SourcePriceSelection,
    ) -> Self {
        Self {
            source_catalog,
            accepted_sellers,
            selection,
        }
    }

    fn accepts(&self, seller_id: &str) -> bool {
        self.accepted_sellers.iter().any(|accepted| accepted == seller_id)
    }

    pub fn lowest_accepted_price(&self, offers: &ProductOffers) -> Option<f64> {
        let listed = offers
            .offers
            .iter()
            .filter(|offer| self.accepts(&offer.seller_id))
            .filter_map(|offer| offer.effective_price());
        let buy_box = offers
            .buy_box
            .iter()
            .filter(|price| self.accepts(&price.seller_id) && price.listing_price > 0.0)
            .map(|price| price.listing_price);

        listed.chain(buy_box).min_by(f64::total_cmp)
    }
}

#[async_trait]
impl Enricher for SourcePricesPass {
    fn name(&self) -> &str {
        match self.selection {
            SourcePriceSelection::Untracked { .. } => Self::UNTRACKED,
            SourcePriceSelection::Tracked { .. } => Self::TRACKED,
        }
    }

    fn predicate(&self, ctx: &PassContext) -> Result<Predicate> {
        let document = match self.selection {
            SourcePriceSelection::Untracked {
                min_visits,
                refresh_after,
            } => matched_catalog()?
                .field(Field::TotalVisits30d, FieldCondition::gte(min_visits))?
                .field(Field::Tracking, FieldCondition::eq(false))?
                .any_of(stale_clauses(
                    Field::SourcePriceUpdatedAt,
                    ctx.started_at - refresh_after,
                ))?,
            SourcePriceSelection::Tracked { refresh_after } => FilterDocument::new()
                .field(Field::Tracking, FieldCondition::eq(true))?
                .any_of(stale_clauses(
                    Field::SourcePriceUpdatedAt,
                    ctx.started_at - refresh_after,
                ))?,
        };
        Ok(document.into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let price = self
            .source_catalog
            .product_offers(&record.key)
            .await?
            .into_option()
            .and_then(|offers| self.lowest_accepted_price(&offers));

        let mutation = MutationDescriptor::for_record(record.key.clone());
        let mutation = match price {
            Some(price) => mutation.set(FieldUpdate::SourcePrice {
                price,
                at: ctx.started_at,
            }),
            None => {
                debug!(key = %record.key, "No accepted-seller offer, recording zero price");
                mutation
                    .set(FieldUpdate::SourcePrice {
                        price: 0.0,
                        at: ctx.started_at,
                    })
                    .set(FieldUpdate::EstimatedProfit(0.0))
            }
        };
        Ok(Some(mutation))
    }
}
