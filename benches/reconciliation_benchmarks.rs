use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use reconciler_core::config::EngineConfig;
use reconciler_core::models::{PriceSample, ProductMapping, RecordKey};
use reconciler_core::orchestration::{CursorPager, FixedClock, ReconciliationPass};
use reconciler_core::passes::ProfitPass;
use reconciler_core::predicate::{Field, Predicate};
use reconciler_core::{InMemoryRecordStore, ProfitPolicy, TimeSeriesAggregator};
use std::sync::Arc;

const RECORDS: usize = 5_000;

fn records() -> Vec<ProductMapping> {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    (0..RECORDS)
        .map(|i| {
            let mut record = ProductMapping::new(RecordKey::new(format!("B0{i:08}")), now);
            if i % 3 != 0 {
                record.catalog_id = Some(format!("MLM{i}"));
                record.listing_price = 500.0 + (i % 700) as f64;
                record.source_price = 300.0 + (i % 400) as f64;
            }
            record.tracking = i % 10 == 0;
            record
        })
        .collect()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn benchmark_predicate_matching(c: &mut Criterion) {
    let records = records();
    let predicate = Predicate::All(vec![
        Predicate::is_set(Field::CatalogId),
        Predicate::eq(Field::IsMatchCorrect, true),
        Predicate::Any(vec![
            Predicate::gt(Field::SourcePrice, 0.0),
            Predicate::eq(Field::Tracking, true),
        ]),
    ]);

    c.bench_function("predicate_matching", |b| {
        b.iter(|| {
            records
                .iter()
                .filter(|record| predicate.matches(black_box(record)))
                .count()
        })
    });
}

fn benchmark_cursor_paging(c: &mut Criterion) {
    let rt = runtime();
    let store = Arc::new(InMemoryRecordStore::with_records(records()));

    c.bench_function("cursor_paging_full_walk", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut pager = CursorPager::new(store.clone(), Predicate::True, 200);
                let mut seen = 0;
                while let Some(page) = pager.next_page().await.unwrap() {
                    seen += page.len();
                }
                seen
            })
        })
    });
}

fn benchmark_profit_pass(c: &mut Criterion) {
    let rt = runtime();
    let engine = EngineConfig {
        page_size: 200,
        concurrency: 8,
    };
    let clock = Arc::new(FixedClock::new(Utc::now()));

    c.bench_function("profit_pass", |b| {
        b.iter_batched(
            || Arc::new(InMemoryRecordStore::with_records(records())),
            |store| {
                rt.block_on(async {
                    ReconciliationPass::new(store, &engine, clock.clone())
                        .run(&ProfitPass::new(ProfitPolicy::default()))
                        .await
                        .unwrap()
                })
            },
            BatchSize::LargeInput,
        )
    });
}

fn benchmark_price_averages(c: &mut Criterion) {
    let now = Utc::now();
    let history: Vec<PriceSample> = (0..720)
        .map(|hours| PriceSample::new(400.0 + (hours % 50) as f64, now - Duration::hours(hours)))
        .collect();

    c.bench_function("price_averages", |b| {
        b.iter(|| TimeSeriesAggregator::averages(black_box(&history), now))
    });
}

criterion_group!(
    benches,
    benchmark_predicate_matching,
    benchmark_cursor_paging,
    benchmark_profit_pass,
    benchmark_price_averages
);
criterion_main!(benches);
