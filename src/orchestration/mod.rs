//! # Orchestration
//!
//! The machinery that turns a predicate and an [`Enricher`] into a completed pass.
//!
//! ## Core Components
//!
//! - **CursorPager**: keyset walk over matching records, one page at a time
//! - **BoundedWorkPool**: per-record enrichment with bounded concurrency and failure isolation
//! - **MutationBatcher**: one atomic bulk write per page
//! - **ReconciliationPass**: the `SELECTING → PAGING → ENRICHING → BATCHING → DONE` state machine
//! - **Clock**: source of the pass start time written into every timestamp
//!
//! Control flow for one page: the pager yields records, the pool runs the enricher on each
//! (every upstream call inside it is rate limited and retried by
//! [`crate::resilience::GuardedUpstream`]), the batcher writes the non-empty descriptors, and
//! the pager advances its cursor floor to the last key of the page.

pub mod clock;
pub mod cursor_pager;
pub mod mutation_batcher;
pub mod pass;
pub mod work_pool;

pub use clock::{Clock, FixedClock, SystemClock};
pub use cursor_pager::CursorPager;
pub use mutation_batcher::MutationBatcher;
pub use pass::{
    Enricher, EnrichmentResult, PassContext, PassState, PassSummary, ReconciliationPass,
};
pub use work_pool::{BoundedWorkPool, PoolReport};
