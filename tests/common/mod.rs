#![allow(dead_code)] // Each integration test binary uses a different subset

pub mod fakes;
pub mod faulty_store;
pub mod strategies;

pub use fakes::*;
pub use faulty_store::*;

use chrono::{DateTime, Duration, TimeZone, Utc};
use reconciler_core::config::{EngineConfig, ReconcilerConfig};
use reconciler_core::models::{ProductMapping, RecordKey};
use reconciler_core::resilience::{RateLimitConfig, RetryConfig};
use reconciler_core::store::InMemoryRecordStore;
use std::sync::Arc;

/// Start instant shared by the integration tests.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn record(key: &str) -> ProductMapping {
    ProductMapping::new(RecordKey::from(key), start() - Duration::days(90))
}

/// Catalog matched, with the given item ids.
pub fn matched_record(key: &str, catalog_id: &str, item_ids: &[&str]) -> ProductMapping {
    let mut r = record(key);
    r.catalog_id = Some(catalog_id.to_string());
    r.item_ids.union(item_ids.iter().copied());
    r
}

pub fn store_with(records: Vec<ProductMapping>) -> Arc<InMemoryRecordStore> {
    Arc::new(InMemoryRecordStore::with_records(records))
}

pub fn engine(page_size: usize, concurrency: usize) -> EngineConfig {
    EngineConfig {
        page_size,
        concurrency,
    }
}

/// Limits loose enough that tests never wait, and a single attempt per call.
pub fn fast_config() -> ReconcilerConfig {
    let limits = RateLimitConfig {
        concurrency: 16,
        interval_ms: 1,
        interval_cap: 10_000,
    };
    let mut config = ReconcilerConfig::default();
    config.engine = engine(3, 4);
    config.rate_limits.marketplace = limits.clone();
    config.rate_limits.source_catalog = limits.clone();
    config.rate_limits.product_feed = limits;
    config.retry = RetryConfig {
        max_retries: 1,
        initial_delay_ms: 1,
        backoff_multiplier: 2.0,
        max_delay_ms: None,
    };
    config
}
