//! Store wrapper that fails chosen calls, for pass-fatal paths.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reconciler_core::error::{ReconcilerError, Result};
use reconciler_core::models::{ControlFlag, MutationDescriptor, ProductMapping, RecordKey};
use reconciler_core::predicate::Predicate;
use reconciler_core::store::{BulkWriteSummary, InMemoryRecordStore, RecordStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct FaultyStore {
    inner: Arc<InMemoryRecordStore>,
    find_page_calls: AtomicUsize,
    bulk_apply_calls: AtomicUsize,
    /// 1-based call number of `find_page` that fails.
    fail_find_page_on: Option<usize>,
    /// 1-based call number of `bulk_apply` that fails (and every later one).
    fail_bulk_apply_from: Option<usize>,
}

impl FaultyStore {
    pub fn wrap(inner: Arc<InMemoryRecordStore>) -> Self {
        Self {
            inner,
            find_page_calls: AtomicUsize::new(0),
            bulk_apply_calls: AtomicUsize::new(0),
            fail_find_page_on: None,
            fail_bulk_apply_from: None,
        }
    }

    pub fn failing_find_page_on(mut self, call: usize) -> Self {
        self.fail_find_page_on = Some(call);
        self
    }

    pub fn failing_bulk_apply_from(mut self, call: usize) -> Self {
        self.fail_bulk_apply_from = Some(call);
        self
    }

    pub fn inner(&self) -> &InMemoryRecordStore {
        &self.inner
    }

    pub fn bulk_apply_calls(&self) -> usize {
        self.bulk_apply_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn find_page(
        &self,
        predicate: &Predicate,
        after: Option<&RecordKey>,
        limit: usize,
    ) -> Result<Vec<ProductMapping>> {
        let call = self.find_page_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_find_page_on == Some(call) {
            return Err(ReconcilerError::store("find_page", "connection reset by peer"));
        }
        self.inner.find_page(predicate, after, limit).await
    }

    async fn find_by_key(&self, key: &RecordKey) -> Result<Option<ProductMapping>> {
        self.inner.find_by_key(key).await
    }

    async fn bulk_apply(&self, mutations: &[MutationDescriptor]) -> Result<BulkWriteSummary> {
        let call = self.bulk_apply_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_bulk_apply_from.is_some_and(|from| call >= from) {
            return Err(ReconcilerError::store("bulk_apply", "connection reset by peer"));
        }
        self.inner.bulk_apply(mutations).await
    }

    async fn insert_missing(
        &self,
        keys: &[RecordKey],
        created_at: DateTime<Utc>,
    ) -> Result<usize> {
        self.inner.insert_missing(keys, created_at).await
    }

    async fn set_flag(&self, keys: &[RecordKey], flag: ControlFlag, value: bool) -> Result<usize> {
        self.inner.set_flag(keys, flag, value).await
    }
}
