//! # Query Builder
//!
//! Renders [`crate::predicate::Predicate`] trees into parameterized PostgreSQL.
//!
//! ## Key Components
//!
//! - [`builder`] - SELECT assembly and execution with bound parameters
//! - [`conditions`] - predicate to `WHERE` translation, `$n` placeholder allocation
//! - [`pagination`] - keyset pagination on the record key
//!
//! ## Semantics
//!
//! Rendering preserves in-memory evaluation exactly, including under `NOT`:
//!
//! - equality uses `IS [NOT] DISTINCT FROM`, so unset values compare like any other value
//! - ordering comparisons are guarded with `IS NOT NULL`, so they are false (never `NULL`)
//!   for unset columns
//! - set-valued columns are `TEXT[]`; "unset" means `cardinality(col) = 0`
//! - price history is a JSONB array searched with an `EXISTS` subquery
//!
//! ## Example Usage
//!
//! ```rust
//! use reconciler_core::predicate::{Field, Predicate};
//! use reconciler_core::query_builder::{KeysetPagination, QueryBuilder};
//!
//! let built = QueryBuilder::new("product_mappings")
//!     .filter(&Predicate::is_set(Field::CatalogId))
//!     .keyset(KeysetPagination::first_page("record_key", 200))
//!     .build();
//!
//! assert_eq!(
//!     built.sql,
//!     "SELECT * FROM product_mappings WHERE catalog_id IS NOT NULL \
//!      ORDER BY record_key COLLATE \"C\" ASC LIMIT 200"
//! );
//! ```

pub mod builder;
pub mod conditions;
pub mod pagination;

pub use builder::{BuiltQuery, QueryBuilder};
pub use conditions::{BindValue, Condition, LogicalOperator, Parameters, WhereClause};
pub use pagination::KeysetPagination;
