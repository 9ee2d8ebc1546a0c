use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `(value, timestamp)` entry of a record's listing price history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

impl PriceSample {
    pub fn new(price: f64, recorded_at: DateTime<Utc>) -> Self {
        Self { price, recorded_at }
    }
}
