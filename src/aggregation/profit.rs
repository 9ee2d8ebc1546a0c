//! Estimated resale profit.
//!
//! ```text
//! profit = listing_price - source_price - shipping_cost - listing_price * commission
//! ```
//!
//! A commission or shipping cost of zero means "unknown" and falls back to the policy
//! default. A zero source price yields a profit of zero; a zero listing price yields the
//! placeholder profit.

use crate::models::ProductMapping;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfitPolicy {
    pub default_commission: f64,
    pub default_shipping_cost: f64,
    /// Profit reported while the listing price is still unknown.
    pub unknown_listing_profit: f64,
}

impl Default for ProfitPolicy {
    fn default() -> Self {
        Self {
            default_commission: 0.15,
            default_shipping_cost: 91.0,
            unknown_listing_profit: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfitInputs {
    pub listing_price: f64,
    pub source_price: f64,
    pub shipping_cost: f64,
    pub commission: f64,
}

impl From<&ProductMapping> for ProfitInputs {
    fn from(record: &ProductMapping) -> Self {
        Self {
            listing_price: record.listing_price,
            source_price: record.source_price,
            shipping_cost: record.shipping_cost,
            commission: record.sale_commission,
        }
    }
}

impl ProfitPolicy {
    pub fn estimate(&self, inputs: ProfitInputs) -> f64 {
        if inputs.source_price <= 0.0 {
            return 0.0;
        }
        if inputs.listing_price <= 0.0 {
            return self.unknown_listing_profit;
        }

        let shipping = known_or(inputs.shipping_cost, self.default_shipping_cost);
        let commission = known_or(inputs.commission, self.default_commission);

        inputs.listing_price
            - inputs.source_price
            - shipping
            - inputs.listing_price * commission
    }
}

fn known_or(value: f64, default: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        default
    }
}
