//! Error types for the reconciliation engine.
//!
//! The taxonomy follows the four failure classes a pass can meet:
//! transient upstream failures (absorbed by [`crate::resilience::RetryPolicy`]),
//! domain-empty results (not errors at all), per-record failures
//! ([`EnrichmentError`], logged and skipped) and pass-fatal failures
//! ([`ReconcilerError`], propagated to the caller).

use crate::config::ConfigurationError;
use crate::models::RecordKey;
use crate::predicate::PredicateError;
use crate::upstream::FailureReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Store error: {operation} - {reason}")]
    Store { operation: String, reason: String },
    #[error("Paging error: {0}")]
    Paging(String),
    #[error("Predicate error: {0}")]
    Predicate(#[from] PredicateError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("Export error: {0}")]
    Export(String),
    #[error("Discovery error: {0}")]
    Discovery(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReconcilerError {
    pub fn store(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ReconcilerError::Store {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error aborts the current pass (store unavailable, broken paging).
    pub fn is_pass_fatal(&self) -> bool {
        matches!(
            self,
            ReconcilerError::Store { .. } | ReconcilerError::Paging(_)
        )
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ReconcilerError {
    fn from(err: sqlx::Error) -> Self {
        ReconcilerError::store("database", err)
    }
}

impl From<serde_json::Error> for ReconcilerError {
    fn from(err: serde_json::Error) -> Self {
        ReconcilerError::Internal(format!("JSON serialization error: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;

/// Failure of a guarded upstream call after the retry policy gave up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    #[error("{service} call failed after {attempts} attempts: {reason}")]
    Exhausted {
        service: String,
        reason: FailureReason,
        attempts: u32,
    },
    #[error("rate limiter for {service} is closed")]
    LimiterClosed { service: String },
}

/// Per-record enrichment failure. Never aborts a pass.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("record {key} cannot be enriched: {reason}")]
    InvalidRecord { key: RecordKey, reason: String },
    #[error("enrichment panicked: {0}")]
    Panicked(String),
}

impl EnrichmentError {
    pub fn invalid(key: &RecordKey, reason: impl Into<String>) -> Self {
        EnrichmentError::InvalidRecord {
            key: key.clone(),
            reason: reason.into(),
        }
    }
}
