//! # Upstream Interfaces
//!
//! Narrow contracts for the external services the engine reconciles against. Adapters
//! (HTTP clients, SDK wrappers) live outside this crate and implement these traits.
//!
//! Every call returns an [`UpstreamOutcome`]: either a value or a failure carrying an
//! explicit [`FailureReason`]. The retry policy classifies on that enum, never on
//! message text.

pub mod client;
pub mod marketplace;
pub mod product_feed;
pub mod source_catalog;

pub use client::{MarketplaceClient, ProductFeedClient, SourceCatalogClient};
pub use marketplace::{
    CatalogListing, CatalogProduct, FeeQuery, ListingFee, MarketplaceApi, ShippingOption,
};
pub use product_feed::ProductFeed;
pub use source_catalog::{BuyBoxPrice, Offer, ProductDetails, ProductOffers, SourceCatalogApi};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an upstream call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Quota exceeded (HTTP 429 and equivalents). Retried with exponential backoff.
    RateLimited,
    /// The service answered "nothing found" (e.g. "no winners found"). A valid empty result.
    NotFound,
    /// Anything else. Retried on the same schedule, fatal for the record once exhausted.
    Other(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::RateLimited => write!(f, "rate limited"),
            FailureReason::NotFound => write!(f, "not found"),
            FailureReason::Other(message) => write!(f, "{message}"),
        }
    }
}

/// Tagged result of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome<T> {
    Ok(T),
    Fail(FailureReason),
}

impl<T> UpstreamOutcome<T> {
    pub fn rate_limited() -> Self {
        UpstreamOutcome::Fail(FailureReason::RateLimited)
    }

    pub fn not_found() -> Self {
        UpstreamOutcome::Fail(FailureReason::NotFound)
    }

    pub fn other(message: impl Into<String>) -> Self {
        UpstreamOutcome::Fail(FailureReason::Other(message.into()))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, UpstreamOutcome::Ok(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> UpstreamOutcome<U> {
        match self {
            UpstreamOutcome::Ok(value) => UpstreamOutcome::Ok(f(value)),
            UpstreamOutcome::Fail(reason) => UpstreamOutcome::Fail(reason),
        }
    }
}

impl<T> From<Result<T, FailureReason>> for UpstreamOutcome<T> {
    fn from(result: Result<T, FailureReason>) -> Self {
        match result {
            Ok(value) => UpstreamOutcome::Ok(value),
            Err(reason) => UpstreamOutcome::Fail(reason),
        }
    }
}

/// Successful result of a guarded call: a value, or the domain-empty answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Value(T),
    Empty,
}

impl<T> Fetched<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Fetched::Value(value) => Some(value),
            Fetched::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Fetched::Empty)
    }
}
