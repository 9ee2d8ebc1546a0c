use super::{FieldUpdate, IdentifierSet, MutationDescriptor, PriceSample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Identity of a record: the external source-catalog key (an ASIN).
///
/// Keys are unique, never reassigned, and define the total order used for cursor paging.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Boolean control flags that gate which passes apply to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlFlag {
    /// Cleared when an operator marks the catalog match as wrong; excludes the
    /// record from pricing, visits and profit passes.
    MatchCorrect,
    /// Set for records on the operator's watch list; refreshed on a tighter schedule.
    Tracking,
}

impl fmt::Display for ControlFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatchCorrect => write!(f, "is_match_correct"),
            Self::Tracking => write!(f, "tracking"),
        }
    }
}

/// A product mapping between the source catalog and the listing marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMapping {
    pub key: RecordKey,

    // Product details from the source catalog
    pub title: Option<String>,
    pub image: Option<String>,
    pub identifiers: IdentifierSet,
    pub details_updated_at: Option<DateTime<Utc>>,

    // Marketplace catalog match
    pub catalog_id: Option<String>,
    pub catalog_identifier: Option<String>,
    pub catalog_id_updated_at: Option<DateTime<Utc>>,
    pub item_ids: IdentifierSet,
    pub category_id: Option<String>,
    pub category_id_updated_at: Option<DateTime<Utc>>,

    // Listing price and its history
    pub listing_price: f64,
    pub listing_price_updated_at: Option<DateTime<Utc>>,
    pub price_history: Vec<PriceSample>,
    pub average_price_30d: f64,
    pub average_price_90d: f64,
    pub average_price_180d: f64,

    // Marketplace costs and demand
    pub sale_commission: f64,
    pub sale_commission_updated_at: Option<DateTime<Utc>>,
    pub shipping_cost: f64,
    pub shipping_cost_updated_at: Option<DateTime<Utc>>,
    pub total_visits_30d: u64,
    pub total_visits_updated_at: Option<DateTime<Utc>>,

    // Source price and derived profit
    pub source_price: f64,
    pub source_price_updated_at: Option<DateTime<Utc>>,
    pub estimated_profit: f64,

    pub is_match_correct: bool,
    pub tracking: bool,
    pub created_at: DateTime<Utc>,
}

impl ProductMapping {
    /// A freshly discovered record: only the identity is populated.
    pub fn new(key: RecordKey, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            title: None,
            image: None,
            identifiers: IdentifierSet::new(),
            details_updated_at: None,
            catalog_id: None,
            catalog_identifier: None,
            catalog_id_updated_at: None,
            item_ids: IdentifierSet::new(),
            category_id: None,
            category_id_updated_at: None,
            listing_price: 0.0,
            listing_price_updated_at: None,
            price_history: Vec::new(),
            average_price_30d: 0.0,
            average_price_90d: 0.0,
            average_price_180d: 0.0,
            sale_commission: 0.0,
            sale_commission_updated_at: None,
            shipping_cost: 0.0,
            shipping_cost_updated_at: None,
            total_visits_30d: 0,
            total_visits_updated_at: None,
            source_price: 0.0,
            source_price_updated_at: None,
            estimated_profit: 0.0,
            is_match_correct: true,
            tracking: false,
            created_at,
        }
    }

    /// Catalog id assigned and not flagged as a wrong match.
    pub fn has_matched_catalog(&self) -> bool {
        self.catalog_id.is_some() && self.is_match_correct
    }

    pub fn flag(&self, flag: ControlFlag) -> bool {
        match flag {
            ControlFlag::MatchCorrect => self.is_match_correct,
            ControlFlag::Tracking => self.tracking,
        }
    }

    pub fn set_flag(&mut self, flag: ControlFlag, value: bool) {
        match flag {
            ControlFlag::MatchCorrect => self.is_match_correct = value,
            ControlFlag::Tracking => self.tracking = value,
        }
    }

    /// Apply a mutation descriptor in place. The caller is responsible for making the
    /// whole descriptor visible atomically.
    pub fn apply(&mut self, mutation: &MutationDescriptor) {
        for update in &mutation.updates {
            self.apply_update(update);
        }

        for sample in &mutation.history_appends {
            self.append_history(*sample);
        }
    }

    fn apply_update(&mut self, update: &FieldUpdate) {
        match update {
            FieldUpdate::Details { title, image, at } => {
                self.title = title.clone();
                self.image = image.clone();
                self.details_updated_at = Some(*at);
            }
            FieldUpdate::MergeIdentifiers(values) => {
                self.identifiers.union(values.iter().cloned());
            }
            FieldUpdate::CatalogMatch {
                catalog_id,
                catalog_identifier,
                at,
            } => {
                self.catalog_id = catalog_id.clone();
                self.catalog_identifier = catalog_identifier.clone();
                self.catalog_id_updated_at = Some(*at);
            }
            FieldUpdate::MergeItemIds(values) => {
                self.item_ids.union(values.iter().cloned());
            }
            FieldUpdate::Category { category_id, at } => {
                self.category_id = category_id.clone();
                self.category_id_updated_at = Some(*at);
            }
            FieldUpdate::ListingPrice { price, at } => {
                self.listing_price = *price;
                self.listing_price_updated_at = Some(*at);
            }
            FieldUpdate::PriceAverages {
                last_30d,
                last_90d,
                last_180d,
            } => {
                self.average_price_30d = *last_30d;
                self.average_price_90d = *last_90d;
                self.average_price_180d = *last_180d;
            }
            FieldUpdate::SaleCommission { rate, at } => {
                self.sale_commission = *rate;
                self.sale_commission_updated_at = Some(*at);
            }
            FieldUpdate::ShippingCost { cost, at } => {
                self.shipping_cost = *cost;
                self.shipping_cost_updated_at = Some(*at);
            }
            FieldUpdate::Visits { total, at } => {
                self.total_visits_30d = *total;
                self.total_visits_updated_at = Some(*at);
            }
            FieldUpdate::SourcePrice { price, at } => {
                self.source_price = *price;
                self.source_price_updated_at = Some(*at);
            }
            FieldUpdate::EstimatedProfit(profit) => {
                self.estimated_profit = *profit;
            }
            FieldUpdate::Flag { flag, value } => self.set_flag(*flag, *value),
        }
    }

    /// Whether `sample` may be appended: history only grows forward in time.
    pub fn accepts_sample(&self, sample: &PriceSample) -> bool {
        self.price_history
            .last()
            .map_or(true, |last| sample.recorded_at >= last.recorded_at)
    }

    /// History as it reads once `sample` is appended.
    pub fn history_with(&self, sample: PriceSample) -> Vec<PriceSample> {
        let mut history = self.price_history.clone();
        if self.accepts_sample(&sample) {
            history.push(sample);
        }
        history
    }

    fn append_history(&mut self, sample: PriceSample) {
        if !self.accepts_sample(&sample) {
            warn!(
                key = %self.key,
                sample_at = %sample.recorded_at,
                last_at = ?self.price_history.last().map(|last| last.recorded_at),
                "Skipping out-of-order price sample"
            );
            return;
        }
        self.price_history.push(sample);
    }
}
