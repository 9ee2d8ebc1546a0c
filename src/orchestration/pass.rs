//! # Reconciliation Pass
//!
//! One bounded run of the engine over a predicate-selected slice of records:
//!
//! ```text
//! SELECTING → PAGING → ENRICHING → BATCHING ─┐
//!     ▲                                      │ (full page)
//!     └──────────────────────────────────────┘
//! PAGING (no records) / BATCHING (short page) / SELECTING (cancelled) → DONE
//! ```
//!
//! Pages are processed strictly one after another and a page's batch commits before the
//! next page is requested. A per-record enrichment failure is counted and skipped; a
//! paging or batching failure aborts the pass and is returned to the caller, leaving
//! earlier pages committed.

use super::clock::Clock;
use super::cursor_pager::CursorPager;
use super::mutation_batcher::MutationBatcher;
use super::work_pool::{BoundedWorkPool, PoolReport};
use crate::config::EngineConfig;
use crate::error::{EnrichmentError, ReconcilerError, Result};
use crate::logging::{log_error, log_pass_operation};
use crate::models::{MutationDescriptor, ProductMapping};
use crate::predicate::Predicate;
use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub type EnrichmentResult = std::result::Result<Option<MutationDescriptor>, EnrichmentError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Selecting,
    Paging,
    Enriching,
    Batching,
    Done,
}

impl PassState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selecting => write!(f, "selecting"),
            Self::Paging => write!(f, "paging"),
            Self::Enriching => write!(f, "enriching"),
            Self::Batching => write!(f, "batching"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Facts shared by every enrichment of one pass run.
#[derive(Debug, Clone)]
pub struct PassContext {
    pub pass_name: String,
    pub run_id: Uuid,
    /// Pass start time. Every timestamp written by the pass is this instant.
    pub started_at: DateTime<Utc>,
}

impl PassContext {
    pub fn new(pass_name: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            pass_name: pass_name.into(),
            run_id: Uuid::new_v4(),
            started_at,
        }
    }
}

/// The per-pass behaviour plugged into [`ReconciliationPass`].
#[async_trait]
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    /// Records this pass applies to, relative to the pass start time.
    fn predicate(&self, ctx: &PassContext) -> Result<Predicate>;

    /// Fetch and derive new field values for one record. `Ok(None)` means "no mutation".
    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub pass_name: String,
    pub run_id: Uuid,
    pub pages: usize,
    pub records_seen: usize,
    /// Records a mutation was written for.
    pub touched: usize,
    /// Touched records whose stored state actually changed.
    pub modified: usize,
    /// Records whose enrichment produced no mutation.
    pub unchanged: usize,
    /// Records whose enrichment failed.
    pub skipped: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassSummary {
    fn new(ctx: &PassContext) -> Self {
        Self {
            pass_name: ctx.pass_name.clone(),
            run_id: ctx.run_id,
            pages: 0,
            records_seen: 0,
            touched: 0,
            modified: 0,
            unchanged: 0,
            skipped: 0,
            cancelled: false,
            started_at: ctx.started_at,
            finished_at: ctx.started_at,
        }
    }
}

pub struct ReconciliationPass {
    store: Arc<dyn RecordStore>,
    batcher: MutationBatcher,
    clock: Arc<dyn Clock>,
    page_size: usize,
    concurrency: usize,
    cancel: CancellationToken,
}

impl ReconciliationPass {
    pub fn new(store: Arc<dyn RecordStore>, engine: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            batcher: MutationBatcher::new(Arc::clone(&store)),
            store,
            clock,
            page_size: engine.page_size,
            concurrency: engine.concurrency,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between pages once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    #[instrument(skip_all, fields(pass = %enricher.name()))]
    pub async fn run(&self, enricher: &dyn Enricher) -> Result<PassSummary> {
        let ctx = PassContext::new(enricher.name(), self.clock.now());
        let run_id = ctx.run_id.to_string();
        let predicate = enricher.predicate(&ctx)?;
        log_pass_operation("run", &ctx.pass_name, Some(&run_id), "started", None);

        let pool = BoundedWorkPool::new(ctx.pass_name.clone(), self.concurrency);
        let mut pager = CursorPager::new(Arc::clone(&self.store), predicate, self.page_size);
        let mut summary = PassSummary::new(&ctx);
        let mut page: Vec<ProductMapping> = Vec::new();
        let mut report = PoolReport::default();
        let mut state = PassState::Selecting;

        while !state.is_terminal() {
            let next = match state {
                PassState::Selecting => {
                    if self.cancel.is_cancelled() {
                        info!(pages = summary.pages, "🛑 Pass cancelled between pages");
                        summary.cancelled = true;
                        PassState::Done
                    } else {
                        PassState::Paging
                    }
                }
                PassState::Paging => match pager.next_page().await {
                    Ok(Some(records)) => {
                        summary.pages += 1;
                        summary.records_seen += records.len();
                        page = records;
                        PassState::Enriching
                    }
                    Ok(None) => PassState::Done,
                    Err(error) => return Err(self.abort(&ctx, "paging", error)),
                },
                PassState::Enriching => {
                    report = pool
                        .run(std::mem::take(&mut page), |record| {
                            enricher.enrich(record, &ctx)
                        })
                        .await;
                    PassState::Batching
                }
                PassState::Batching => {
                    let batch = std::mem::take(&mut report);
                    summary.unchanged += batch.unchanged;
                    summary.skipped += batch.failed;

                    let written = match self
                        .batcher
                        .apply(batch.mutations.into_iter().map(Some))
                        .await
                    {
                        Ok(written) => written,
                        Err(error) => return Err(self.abort(&ctx, "batching", error)),
                    };
                    summary.touched += written.matched;
                    summary.modified += written.modified;

                    if pager.is_finished() {
                        PassState::Done
                    } else {
                        PassState::Selecting
                    }
                }
                PassState::Done => PassState::Done,
            };
            debug!(from = %state, to = %next, "Pass state transition");
            state = next;
        }

        summary.finished_at = self.clock.now();
        let details = format!(
            "pages={} seen={} touched={} unchanged={} skipped={}",
            summary.pages, summary.records_seen, summary.touched, summary.unchanged, summary.skipped
        );
        log_pass_operation(
            "run",
            &ctx.pass_name,
            Some(&run_id),
            if summary.cancelled { "cancelled" } else { "completed" },
            Some(&details),
        );
        Ok(summary)
    }

    fn abort(&self, ctx: &PassContext, stage: &str, error: ReconcilerError) -> ReconcilerError {
        log_error(
            "reconciliation_pass",
            stage,
            &error.to_string(),
            Some(&ctx.pass_name),
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldUpdate, RecordKey};
    use crate::orchestration::clock::FixedClock;
    use crate::predicate::Field;
    use crate::store::InMemoryRecordStore;
    use chrono::{Duration, TimeZone};

    /// Marks every record with a listing price older than 24h.
    struct PriceStamp;

    #[async_trait]
    impl Enricher for PriceStamp {
        fn name(&self) -> &str {
            "price_stamp"
        }

        fn predicate(&self, ctx: &PassContext) -> Result<Predicate> {
            Ok(Predicate::stale(
                Field::ListingPriceUpdatedAt,
                ctx.started_at - Duration::hours(24),
            ))
        }

        async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
            if record.key.as_str() == "BAD" {
                return Err(EnrichmentError::invalid(&record.key, "rejected"));
            }
            Ok(Some(MutationDescriptor::for_record(record.key).set(
                FieldUpdate::ListingPrice {
                    price: 10.0,
                    at: ctx.started_at,
                },
            )))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn engine(page_size: usize) -> EngineConfig {
        EngineConfig {
            page_size,
            concurrency: 2,
        }
    }

    fn store_with(keys: &[&str]) -> Arc<InMemoryRecordStore> {
        Arc::new(InMemoryRecordStore::with_records(keys.iter().map(|key| {
            ProductMapping::new(RecordKey::from(*key), start() - Duration::days(1))
        })))
    }

    #[tokio::test]
    async fn second_run_touches_nothing() {
        let store = store_with(&["A", "B", "C", "D", "E"]);
        let pass = ReconciliationPass::new(
            store.clone(),
            &engine(2),
            Arc::new(FixedClock::new(start())),
        );

        let first = pass.run(&PriceStamp).await.unwrap();
        assert_eq!(first.touched, 5);
        assert_eq!(first.pages, 3);

        let second = pass.run(&PriceStamp).await.unwrap();
        assert_eq!(second.touched, 0);
        assert_eq!(second.records_seen, 0);
    }

    #[tokio::test]
    async fn failed_records_are_skipped_not_fatal() {
        let store = store_with(&["A", "BAD", "C"]);
        let pass =
            ReconciliationPass::new(store.clone(), &engine(10), Arc::new(FixedClock::new(start())));

        let summary = pass.run(&PriceStamp).await.unwrap();
        assert_eq!(summary.touched, 2);
        assert_eq!(summary.skipped, 1);
        assert!(store.get(&"BAD".into()).unwrap().listing_price_updated_at.is_none());
    }

    #[tokio::test]
    async fn cancelled_pass_stops_before_first_page() {
        let store = store_with(&["A", "B"]);
        let token = CancellationToken::new();
        let pass =
            ReconciliationPass::new(store.clone(), &engine(1), Arc::new(FixedClock::new(start())))
                .with_cancellation(token.clone());
        token.cancel();

        let summary = pass.run(&PriceStamp).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.pages, 0);
        assert!(store.get(&"A".into()).unwrap().listing_price_updated_at.is_none());
    }

    #[test]
    fn only_done_is_terminal() {
        assert!(PassState::Done.is_terminal());
        assert!(!PassState::Batching.is_terminal());
        assert_eq!(PassState::Enriching.to_string(), "enriching");
    }
}
