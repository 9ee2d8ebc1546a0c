#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Reconciler Core
//!
//! Batch reconciliation engine that keeps a catalog of product mappings in sync with
//! rate-limited upstream services.
//!
//! ## Overview
//!
//! Each record links a source-catalog product (keyed by its [`models::RecordKey`]) to a
//! marketplace catalog entry. A *pass* selects the records whose fields are stale, asks the
//! upstream services for fresh values, and writes them back in one bulk write per page.
//! Running the same pass twice in a row does nothing the second time: every write stamps
//! the pass start time, and selection is driven by those timestamps.
//!
//! ## Architecture
//!
//! ```text
//! predicate ──► CursorPager ──► BoundedWorkPool ──► MutationBatcher ──► RecordStore
//!                                   │
//!                                   └─► Enricher ──► GuardedUpstream (RateLimiter + RetryPolicy)
//! ```
//!
//! ## Key Features
//!
//! - **Keyset paging**: ascending key order with a strictly increasing cursor floor, so no
//!   record is visited twice in a pass even while matching records change underneath
//! - **Shared rate limits**: one limiter per upstream service across every worker and pass
//! - **Failure isolation**: a failing or panicking record is logged and skipped; only store
//!   and paging failures abort a pass
//! - **Atomic pages**: each page's mutations become visible together or not at all
//!
//! ## Module Organization
//!
//! - [`models`] - Records, keys, price samples and mutation descriptors
//! - [`predicate`] - Typed selection predicates and the filter document builder
//! - [`query_builder`] - Predicate to parameterized PostgreSQL translation
//! - [`store`] - The [`store::RecordStore`] trait and its in-memory and PostgreSQL backends
//! - [`resilience`] - Rate limiting, retry with backoff, and their combination
//! - [`upstream`] - Upstream service traits, outcomes and guarded clients
//! - [`aggregation`] - Rolling price averages and the profit formula
//! - [`orchestration`] - Pager, work pool, batcher and the pass state machine
//! - [`passes`] - The named enrichment passes
//! - [`maintenance`] - Record discovery and sheet-driven flag synchronisation
//! - [`export`] - Sheet export of profitable records
//! - [`pipeline`] - Ordered end-to-end run
//! - [`config`] - Layered, validated configuration
//! - [`logging`] - Structured `tracing` setup and log helpers
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reconciler_core::config::ConfigManager;
//! use reconciler_core::orchestration::{ReconciliationPass, SystemClock};
//! use reconciler_core::passes::ProfitPass;
//! use reconciler_core::store::InMemoryRecordStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! reconciler_core::logging::init_structured_logging();
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let store = Arc::new(InMemoryRecordStore::new());
//! let pass = ReconciliationPass::new(store, &config.engine, Arc::new(SystemClock));
//! let summary = pass.run(&ProfitPass::new(config.profit.clone())).await?;
//!
//! println!("touched {} records", summary.touched);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! Unit tests live next to the code; integration tests under `tests/` run full passes
//! against the in-memory store with fake upstream services. PostgreSQL-backed code is
//! behind the default `postgres` feature.
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod aggregation;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod logging;
pub mod maintenance;
pub mod models;
pub mod orchestration;
pub mod passes;
pub mod pipeline;
pub mod predicate;
pub mod query_builder;
pub mod resilience;
pub mod store;
pub mod upstream;

pub use aggregation::{PriceAverages, ProfitPolicy, TimeSeriesAggregator};
pub use config::{ConfigManager, ReconcilerConfig};
pub use error::{EnrichmentError, ReconcilerError, Result, UpstreamError};
pub use models::{ControlFlag, MutationDescriptor, ProductMapping, RecordKey};
pub use orchestration::{Enricher, PassContext, PassSummary, ReconciliationPass};
pub use pipeline::{Collaborators, PipelineReport, ReconciliationPipeline};
pub use predicate::{Field, FilterDocument, Predicate};
pub use resilience::{GuardedUpstream, RateLimiter, RetryPolicy};
pub use store::{InMemoryRecordStore, RecordStore};
