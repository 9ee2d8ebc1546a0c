use super::{ControlFlag, PriceSample, RecordKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One field assignment produced by enrichment.
///
/// Every refreshed field is written through a variant that carries its own
/// timestamp, so a `*_updated_at` column can only change together with its field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldUpdate {
    Details {
        title: Option<String>,
        image: Option<String>,
        at: DateTime<Utc>,
    },
    MergeIdentifiers(Vec<String>),
    CatalogMatch {
        catalog_id: Option<String>,
        catalog_identifier: Option<String>,
        at: DateTime<Utc>,
    },
    MergeItemIds(Vec<String>),
    Category {
        category_id: Option<String>,
        at: DateTime<Utc>,
    },
    ListingPrice {
        price: f64,
        at: DateTime<Utc>,
    },
    PriceAverages {
        last_30d: f64,
        last_90d: f64,
        last_180d: f64,
    },
    SaleCommission {
        rate: f64,
        at: DateTime<Utc>,
    },
    ShippingCost {
        cost: f64,
        at: DateTime<Utc>,
    },
    Visits {
        total: u64,
        at: DateTime<Utc>,
    },
    SourcePrice {
        price: f64,
        at: DateTime<Utc>,
    },
    EstimatedProfit(f64),
    Flag {
        flag: ControlFlag,
        value: bool,
    },
}

/// Per-record set of field assignments and history appends, not yet applied to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationDescriptor {
    pub key: RecordKey,
    pub updates: Vec<FieldUpdate>,
    pub history_appends: Vec<PriceSample>,
}

impl MutationDescriptor {
    pub fn for_record(key: RecordKey) -> Self {
        Self {
            key,
            updates: Vec::new(),
            history_appends: Vec::new(),
        }
    }

    pub fn set(mut self, update: FieldUpdate) -> Self {
        self.updates.push(update);
        self
    }

    pub fn append_history(mut self, sample: PriceSample) -> Self {
        self.history_appends.push(sample);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.history_appends.is_empty()
    }
}
