use crate::error::Result;
use crate::logging::log_store_operation;
use crate::models::MutationDescriptor;
use crate::store::{BulkWriteSummary, RecordStore};
use std::sync::Arc;
use std::time::Instant;

/// Applies one page worth of mutation descriptors as a single bulk write.
#[derive(Clone)]
pub struct MutationBatcher {
    store: Arc<dyn RecordStore>,
}

impl MutationBatcher {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Drop "no mutation" entries and write the rest atomically. Skips the store
    /// round-trip when nothing is left.
    pub async fn apply<I>(&self, mutations: I) -> Result<BulkWriteSummary>
    where
        I: IntoIterator<Item = Option<MutationDescriptor>>,
    {
        let batch: Vec<MutationDescriptor> = mutations
            .into_iter()
            .flatten()
            .filter(|mutation| !mutation.is_empty())
            .collect();

        if batch.is_empty() {
            return Ok(BulkWriteSummary::default());
        }

        let started = Instant::now();
        let summary = self.store.bulk_apply(&batch).await?;
        log_store_operation(
            "bulk_apply",
            batch.len(),
            "committed",
            Some(started.elapsed().as_millis() as u64),
            None,
        );
        Ok(summary)
    }
}
