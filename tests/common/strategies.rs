use chrono::Duration;
use proptest::prelude::*;
use reconciler_core::models::PriceSample;

use super::start;

/// Source-catalog style keys, e.g. `B07XJ8C8F5`.
pub fn record_key_strategy() -> impl Strategy<Value = String> {
    "B0[0-9A-Z]{8}"
}

/// Distinct keys, each paired with whether it matches the pass predicate.
pub fn keyed_records_strategy() -> impl Strategy<Value = Vec<(String, bool)>> {
    prop::collection::btree_map(record_key_strategy(), any::<bool>(), 0..120)
        .prop_map(|records| records.into_iter().collect())
}

/// Price samples within the last 200 days of [`start`], in arbitrary order.
pub fn price_history_strategy() -> impl Strategy<Value = Vec<PriceSample>> {
    prop::collection::vec((0.0f64..5_000.0, 0i64..200 * 24), 0..60).prop_map(|samples| {
        samples
            .into_iter()
            .map(|(price, hours_ago)| PriceSample::new(price, start() - Duration::hours(hours_ago)))
            .collect()
    })
}
