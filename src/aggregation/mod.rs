//! # Aggregation
//!
//! Pure, CPU-only computations over already-reconciled fields. Nothing here performs I/O
//! or suspends.

pub mod profit;
pub mod time_series;

pub use profit::{ProfitInputs, ProfitPolicy};
pub use time_series::{PriceAverages, TimeSeriesAggregator};
