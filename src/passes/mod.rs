//! # Reconciliation Passes
//!
//! The named passes run by the pipeline. Each one is an [`Enricher`](crate::orchestration::Enricher):
//! a staleness predicate built from the pass start time, plus a per-record enrichment that
//! calls upstream services through their guarded clients and returns a mutation descriptor.
//!
//! | Pass                     | Owns                                          |
//! |--------------------------|-----------------------------------------------|
//! | `product_details`        | title, image, identifiers                     |
//! | `catalog_ids`            | catalog id and the identifier that matched it |
//! | `listing_prices`         | listing price, item ids, price history, averages |
//! | `category_ids`           | category id                                   |
//! | `sale_fees`              | sale commission                               |
//! | `shipping_costs_daily`   | shipping cost (never fetched)                 |
//! | `shipping_costs_monthly` | shipping cost (periodic refresh)              |
//! | `visits`                 | 30-day visit total                            |
//! | `source_prices`          | source price (untracked records)              |
//! | `tracked_source_prices`  | source price (tracked records)                 |
//! | `profit`                 | estimated profit                              |
//!
//! A domain-empty upstream answer is written back as an explicit empty value with a fresh
//! timestamp, so the record is not selected again until its threshold elapses.

pub mod catalog_ids;
pub mod category_ids;
pub mod listing_prices;
pub mod product_details;
pub mod profit;
pub mod sale_fees;
pub mod shipping_costs;
pub mod source_prices;
pub mod visits;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog_ids::CatalogIdsPass;
pub use category_ids::CategoryIdsPass;
pub use listing_prices::ListingPricesPass;
pub use product_details::ProductDetailsPass;
pub use profit::ProfitPass;
pub use sale_fees::{FeeCache, SaleFeesPass};
pub use shipping_costs::{ShippingCostsPass, ShippingSchedule};
pub use source_prices::{SourcePriceSelection, SourcePricesPass};
pub use visits::VisitsPass;

use crate::error::EnrichmentError;
use crate::predicate::{Field, FieldCondition, FilterDocument, Predicate, PredicateError};
use chrono::{DateTime, Utc};

/// Catalog id assigned and not flagged as a wrong match.
pub(crate) fn matched_catalog() -> Result<FilterDocument, PredicateError> {
    FilterDocument::new()
        .field(Field::CatalogId, FieldCondition::Set)?
        .field(Field::IsMatchCorrect, FieldCondition::eq(true))
}

/// Never written, or written at or before `cutoff`.
pub(crate) fn stale_clauses(timestamp: Field, cutoff: DateTime<Utc>) -> Vec<Predicate> {
    vec![
        Predicate::is_unset(timestamp),
        Predicate::lte(timestamp, cutoff),
    ]
}

/// Outcome of a lookup fanned out over several ids of one record, where a failure on
/// one id does not stop the others.
#[derive(Debug, Default)]
pub(crate) struct FanOut {
    pub answered: usize,
    pub last_error: Option<EnrichmentError>,
}

impl FanOut {
    pub fn record_error(&mut self, error: impl Into<EnrichmentError>) {
        self.last_error = Some(error.into());
    }

    /// Fail the record only when every lookup failed; partial answers are kept.
    pub fn into_result(self) -> Result<(), EnrichmentError> {
        match (self.answered, self.last_error) {
            (0, Some(error)) => Err(error),
            _ => Ok(()),
        }
    }
}
