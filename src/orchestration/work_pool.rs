//! # Bounded Work Pool
//!
//! Runs one enrichment per record with at most `concurrency` in flight. A failing or
//! panicking enrichment becomes a counted per-record failure; it never cancels siblings.
//! Completion order is not input order.

use crate::error::EnrichmentError;
use crate::logging::log_record_failure;
use crate::models::{MutationDescriptor, ProductMapping, RecordKey};
use futures::{stream, FutureExt, StreamExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// What one page of enrichment produced.
#[derive(Debug, Default)]
pub struct PoolReport {
    pub mutations: Vec<MutationDescriptor>,
    /// Enrichments that returned "no mutation".
    pub unchanged: usize,
    /// Enrichments that failed or panicked.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct BoundedWorkPool {
    name: String,
    concurrency: usize,
}

impl BoundedWorkPool {
    pub fn new(name: impl Into<String>, concurrency: usize) -> Self {
        Self {
            name: name.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn run<F, Fut>(&self, records: Vec<ProductMapping>, transform: F) -> PoolReport
    where
        F: Fn(ProductMapping) -> Fut,
        Fut: Future<Output = Result<Option<MutationDescriptor>, EnrichmentError>>,
    {
        let transform = &transform;
        let outcomes: Vec<(RecordKey, Result<Option<MutationDescriptor>, EnrichmentError>)> =
            stream::iter(records)
                .map(|record| {
                    let key = record.key.clone();
                    async move {
                        let outcome = AssertUnwindSafe(async move { transform(record).await })
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| {
                                Err(EnrichmentError::Panicked(panic_message(panic.as_ref())))
                            });
                        (key, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut report = PoolReport::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(Some(mutation)) if !mutation.is_empty() => report.mutations.push(mutation),
                Ok(_) => report.unchanged += 1,
                Err(error) => {
                    report.failed += 1;
                    log_record_failure(&self.name, key.as_str(), &error.to_string());
                }
            }
        }
        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
