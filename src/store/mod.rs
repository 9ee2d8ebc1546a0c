//! # Record Store
//!
//! The single source of truth for records. Passes read pages through
//! [`RecordStore::find_page`] and write back through [`RecordStore::bulk_apply`]; no record
//! state is cached across pages.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryRecordStore`] for tests, benches and embedding
//! - [`PgRecordStore`] (feature `postgres`) backed by a `product_mappings` table

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryRecordStore;
#[cfg(feature = "postgres")]
pub use postgres::PgRecordStore;

use crate::error::Result;
use crate::models::{ControlFlag, MutationDescriptor, ProductMapping, RecordKey};
use crate::predicate::Predicate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkWriteSummary {
    /// Descriptors whose record exists.
    pub matched: usize,
    /// Matched records whose stored state actually changed.
    pub modified: usize,
    /// Descriptors whose record does not exist. Records are never created by a write.
    pub missing: usize,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Up to `limit` records matching `predicate` with key strictly greater than `after`,
    /// in ascending key order.
    async fn find_page(
        &self,
        predicate: &Predicate,
        after: Option<&RecordKey>,
        limit: usize,
    ) -> Result<Vec<ProductMapping>>;

    async fn find_by_key(&self, key: &RecordKey) -> Result<Option<ProductMapping>>;

    /// Apply every descriptor as one unit: either all become visible or none do.
    async fn bulk_apply(&self, mutations: &[MutationDescriptor]) -> Result<BulkWriteSummary>;

    /// Create identity-only records for keys not yet stored. Returns how many were created.
    async fn insert_missing(&self, keys: &[RecordKey], created_at: DateTime<Utc>)
        -> Result<usize>;

    /// Set `flag` to `value` on the given keys. Returns how many records changed.
    async fn set_flag(&self, keys: &[RecordKey], flag: ControlFlag, value: bool) -> Result<usize>;
}
