use super::{BulkWriteSummary, RecordStore};
use crate::error::Result;
use crate::models::{ControlFlag, MutationDescriptor, ProductMapping, RecordKey};
use crate::predicate::Predicate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Record store held in process memory, ordered by key.
///
/// A bulk write takes the write lock once, so concurrent readers observe either none or
/// all of a batch.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<RecordKey, ProductMapping>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ProductMapping>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.records.write();
            for record in records {
                guard.insert(record.key.clone(), record);
            }
        }
        store
    }

    pub fn get(&self, key: &RecordKey) -> Option<ProductMapping> {
        self.records.read().get(key).cloned()
    }

    /// All records in key order.
    pub fn snapshot(&self) -> Vec<ProductMapping> {
        self.records.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_page(
        &self,
        predicate: &Predicate,
        after: Option<&RecordKey>,
        limit: usize,
    ) -> Result<Vec<ProductMapping>> {
        let lower = match after {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };

        let records = self.records.read();
        Ok(records
            .range((lower, Bound::Unbounded))
            .map(|(_, record)| record)
            .filter(|record| predicate.matches(record))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_key(&self, key: &RecordKey) -> Result<Option<ProductMapping>> {
        Ok(self.get(key))
    }

    async fn bulk_apply(&self, mutations: &[MutationDescriptor]) -> Result<BulkWriteSummary> {
        let mut summary = BulkWriteSummary::default();
        let mut records = self.records.write();

        for mutation in mutations {
            match records.get_mut(&mutation.key) {
                Some(record) => {
                    summary.matched += 1;
                    let before = record.clone();
                    record.apply(mutation);
                    if *record != before {
                        summary.modified += 1;
                    }
                }
                None => summary.missing += 1,
            }
        }

        Ok(summary)
    }

    async fn insert_missing(
        &self,
        keys: &[RecordKey],
        created_at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut records = self.records.write();
        let mut inserted = 0;
        for key in keys {
            if !records.contains_key(key) {
                records.insert(key.clone(), ProductMapping::new(key.clone(), created_at));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn set_flag(&self, keys: &[RecordKey], flag: ControlFlag, value: bool) -> Result<usize> {
        let mut records = self.records.write();
        let mut changed = 0;
        for key in keys {
            if let Some(record) = records.get_mut(key) {
                if record.flag(flag) != value {
                    record.set_flag(flag, value);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}
