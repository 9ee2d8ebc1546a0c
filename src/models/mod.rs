//! # Models
//!
//! The reconciled record ([`ProductMapping`]) and the value types it is built from.
//!
//! Records are created once by discovery with only their [`RecordKey`] populated and are
//! then mutated exclusively through [`MutationDescriptor`]s produced by reconciliation
//! passes. No pass ever deletes a record.

pub mod identifier_set;
pub mod mutation;
pub mod price_sample;
pub mod product_mapping;

pub use identifier_set::IdentifierSet;
pub use mutation::{FieldUpdate, MutationDescriptor};
pub use price_sample::PriceSample;
pub use product_mapping::{ControlFlag, ProductMapping, RecordKey};
