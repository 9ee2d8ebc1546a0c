mod common;

use async_trait::async_trait;
use common::strategies::*;
use common::{engine, record, start, store_with};
use parking_lot::Mutex;
use proptest::prelude::*;
use reconciler_core::aggregation::TimeSeriesAggregator;
use reconciler_core::error::Result as ReconcilerResult;
use reconciler_core::models::{FieldUpdate, MutationDescriptor, ProductMapping, RecordKey};
use reconciler_core::orchestration::{
    CursorPager, EnrichmentResult, Enricher, FixedClock, PassContext, ReconciliationPass,
};
use reconciler_core::predicate::{Field, Predicate};
use std::collections::HashMap;
use std::sync::Arc;

/// Tracked records are the ones the predicate selects.
fn seed(records: &[(String, bool)]) -> Vec<ProductMapping> {
    records
        .iter()
        .map(|(key, selected)| {
            let mut r = record(key);
            r.tracking = *selected;
            r
        })
        .collect()
}

fn expected(records: &[(String, bool)]) -> Vec<String> {
    records
        .iter()
        .filter(|(_, selected)| *selected)
        .map(|(key, _)| key.clone())
        .collect()
}

/// Untracks every record it visits, so each visited record stops matching mid-walk.
#[derive(Default)]
struct Untrack {
    visits: Mutex<HashMap<RecordKey, usize>>,
}

#[async_trait]
impl Enricher for Untrack {
    fn name(&self) -> &str {
        "untrack"
    }

    fn predicate(&self, _ctx: &PassContext) -> ReconcilerResult<Predicate> {
        Ok(Predicate::eq(Field::Tracking, true))
    }

    async fn enrich(&self, record: ProductMapping, _ctx: &PassContext) -> EnrichmentResult {
        *self.visits.lock().entry(record.key.clone()).or_default() += 1;
        Ok(Some(MutationDescriptor::for_record(record.key).set(
            FieldUpdate::Flag {
                flag: reconciler_core::models::ControlFlag::Tracking,
                value: false,
            },
        )))
    }
}

proptest! {
    /// Property: the pager yields every matching record exactly once, in ascending key order
    #[test]
    fn pager_yields_each_match_once_in_order(
        records in keyed_records_strategy(),
        page_size in 1usize..12,
    ) {
        let store = store_with(seed(&records));
        let seen = tokio_test::block_on(async {
            let mut pager = CursorPager::new(store, Predicate::eq(Field::Tracking, true), page_size);
            let mut seen = Vec::new();
            while let Some(page) = pager.next_page().await.unwrap() {
                prop_assert!(page.len() <= page_size);
                seen.extend(page.into_iter().map(|r| r.key.as_str().to_string()));
            }
            Ok::<_, TestCaseError>(seen)
        })?;

        prop_assert_eq!(seen, expected(&records));
    }

    /// Property: records mutated out of the predicate during a pass are neither revisited
    /// nor cause later records to be skipped
    #[test]
    fn pass_visits_each_match_once_while_mutating(
        records in keyed_records_strategy(),
        page_size in 1usize..12,
        concurrency in 1usize..6,
    ) {
        let store = store_with(seed(&records));
        let enricher = Untrack::default();
        let summary = tokio_test::block_on(async {
            ReconciliationPass::new(
                store.clone(),
                &engine(page_size, concurrency),
                Arc::new(FixedClock::new(start())),
            )
            .run(&enricher)
            .await
            .unwrap()
        });

        let wanted = expected(&records);
        let visits = enricher.visits.lock();
        prop_assert_eq!(summary.touched, wanted.len());
        prop_assert_eq!(visits.len(), wanted.len());
        prop_assert!(visits.values().all(|count| *count == 1));
        for key in &wanted {
            prop_assert!(!store.get(&RecordKey::from(key.as_str())).unwrap().tracking);
        }
    }

    /// Property: a window average lies between the smallest and largest sample in the window
    #[test]
    fn window_average_is_bounded(history in price_history_strategy(), window in 1i64..200) {
        let since = start() - chrono::Duration::days(window);
        let in_window: Vec<f64> = history
            .iter()
            .filter(|s| s.recorded_at >= since)
            .map(|s| s.price)
            .collect();
        let average = TimeSeriesAggregator::average(&history, window, start());

        if in_window.is_empty() {
            prop_assert_eq!(average, 0.0);
        } else {
            let min = in_window.iter().copied().fold(f64::INFINITY, f64::min);
            let max = in_window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(average >= min - 1e-6 && average <= max + 1e-6);
        }
    }
}
