//! In-process fakes for pass unit tests.

use crate::models::{ProductMapping, RecordKey};
use crate::orchestration::PassContext;
use crate::resilience::{GuardedUpstream, RateLimitConfig, RetryConfig};
use crate::upstream::{
    BuyBoxPrice, CatalogListing, CatalogProduct, FeeQuery, ListingFee, MarketplaceApi,
    MarketplaceClient, Offer, ProductDetails, ProductOffers, ShippingOption, SourceCatalogApi,
    SourceCatalogClient, UpstreamOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub(crate) fn ctx(pass_name: &str) -> PassContext {
    PassContext::new(pass_name, start())
}

pub(crate) fn record(key: &str) -> ProductMapping {
    ProductMapping::new(RecordKey::from(key), start() - chrono::Duration::days(60))
}

/// Single attempt, no waiting.
pub(crate) fn guard(service: &str) -> GuardedUpstream {
    GuardedUpstream::new(
        service,
        RateLimitConfig {
            concurrency: 8,
            interval_ms: 1,
            interval_cap: 1000,
        },
        RetryConfig {
            max_retries: 1,
            initial_delay_ms: 1,
            backoff_multiplier: 2.0,
            max_delay_ms: None,
        },
    )
}

fn lookup<T: Clone>(
    map: &Mutex<HashMap<String, T>>,
    failing: &Mutex<HashSet<String>>,
    id: &str,
) -> UpstreamOutcome<T> {
    if failing.lock().contains(id) {
        return UpstreamOutcome::other(format!("{id} unavailable"));
    }
    match map.lock().get(id) {
        Some(value) => UpstreamOutcome::Ok(value.clone()),
        None => UpstreamOutcome::not_found(),
    }
}

/// Unknown ids answer `NotFound`; ids in `failing` answer a non-retryable failure.
#[derive(Default)]
pub(crate) struct FakeMarketplace {
    pub search: Mutex<HashMap<String, Vec<CatalogProduct>>>,
    pub listings: Mutex<HashMap<String, Vec<CatalogListing>>>,
    pub categories: Mutex<HashMap<String, String>>,
    pub fees: Mutex<HashMap<String, ListingFee>>,
    pub shipping: Mutex<HashMap<String, Vec<ShippingOption>>>,
    pub visits: Mutex<HashMap<String, u64>>,
    pub failing: Mutex<HashSet<String>>,
    pub fee_queries: Mutex<Vec<FeeQuery>>,
    pub calls: AtomicUsize,
}

impl FakeMarketplace {
    pub fn with_catalog(self, identifier: &str, catalog_id: &str) -> Self {
        self.search.lock().insert(
            identifier.to_string(),
            vec![CatalogProduct {
                id: catalog_id.to_string(),
            }],
        );
        self
    }

    pub fn with_listings(self, catalog_id: &str, listings: &[(&str, f64)]) -> Self {
        self.listings.lock().insert(
            catalog_id.to_string(),
            listings
                .iter()
                .map(|(item_id, price)| CatalogListing {
                    item_id: item_id.to_string(),
                    price: *price,
                })
                .collect(),
        );
        self
    }

    pub fn with_category(self, item_id: &str, category_id: &str) -> Self {
        self.categories
            .lock()
            .insert(item_id.to_string(), category_id.to_string());
        self
    }

    pub fn with_fee(self, category_id: &str, percentage_fee: f64) -> Self {
        self.fees
            .lock()
            .insert(category_id.to_string(), ListingFee { percentage_fee });
        self
    }

    pub fn with_shipping(self, item_id: &str, options: &[(&str, f64, f64)]) -> Self {
        self.shipping.lock().insert(
            item_id.to_string(),
            options
                .iter()
                .map(|(name, base_cost, list_cost)| ShippingOption {
                    name: name.to_string(),
                    base_cost: *base_cost,
                    list_cost: *list_cost,
                })
                .collect(),
        );
        self
    }

    pub fn with_visits(self, item_id: &str, visits: u64) -> Self {
        self.visits.lock().insert(item_id.to_string(), visits);
        self
    }

    pub fn failing_on(self, id: &str) -> Self {
        self.failing.lock().insert(id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_client(self) -> (Arc<FakeMarketplace>, MarketplaceClient) {
        let fake = Arc::new(self);
        let client = MarketplaceClient::new(fake.clone(), guard("marketplace"));
        (fake, client)
    }
}

#[async_trait]
impl MarketplaceApi for FakeMarketplace {
    async fn search_catalog(&self, identifier: &str) -> UpstreamOutcome<Vec<CatalogProduct>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lookup(&self.search, &self.failing, identifier)
    }

    async fn catalog_listings(&self, catalog_id: &str) -> UpstreamOutcome<Vec<CatalogListing>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lookup(&self.listings, &self.failing, catalog_id)
    }

    async fn item_category(&self, item_id: &str) -> UpstreamOutcome<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lookup(&self.categories, &self.failing, item_id)
    }

    async fn listing_fee(&self, query: &FeeQuery) -> UpstreamOutcome<ListingFee> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.fee_queries.lock().push(query.clone());
        lookup(&self.fees, &self.failing, &query.category_id)
    }

    async fn shipping_options(
        &self,
        item_id: &str,
        _zip_code: &str,
    ) -> UpstreamOutcome<Vec<ShippingOption>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lookup(&self.shipping, &self.failing, item_id)
    }

    async fn item_visits(&self, item_id: &str) -> UpstreamOutcome<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lookup(&self.visits, &self.failing, item_id)
    }
}

#[derive(Default)]
pub(crate) struct FakeSourceCatalog {
    pub details: Mutex<HashMap<String, ProductDetails>>,
    pub offers: Mutex<HashMap<String, ProductOffers>>,
    pub failing: Mutex<HashSet<String>>,
}

impl FakeSourceCatalog {
    pub fn with_details(self, key: &str, title: &str, identifiers: &[&str]) -> Self {
        self.details.lock().insert(
            key.to_string(),
            ProductDetails {
                identifiers: identifiers.iter().map(|id| id.to_string()).collect(),
                title: Some(title.to_string()),
                image: Some(format!("https://images.example/{key}.jpg")),
            },
        );
        self
    }

    pub fn with_offers(self, key: &str, offers: &[(&str, f64)], buy_box: &[(&str, f64)]) -> Self {
        self.offers.lock().insert(
            key.to_string(),
            ProductOffers {
                offers: offers
                    .iter()
                    .map(|(seller_id, price)| Offer {
                        seller_id: seller_id.to_string(),
                        listing_price: Some(*price),
                        quantity_discount_price: None,
                    })
                    .collect(),
                buy_box: buy_box
                    .iter()
                    .map(|(seller_id, price)| BuyBoxPrice {
                        seller_id: seller_id.to_string(),
                        listing_price: *price,
                    })
                    .collect(),
            },
        );
        self
    }

    pub fn failing_on(self, key: &str) -> Self {
        self.failing.lock().insert(key.to_string());
        self
    }

    pub fn into_client(self) -> (Arc<FakeSourceCatalog>, SourceCatalogClient) {
        let fake = Arc::new(self);
        let client = SourceCatalogClient::new(fake.clone(), guard("source_catalog"));
        (fake, client)
    }
}

#[async_trait]
impl SourceCatalogApi for FakeSourceCatalog {
    async fn product_details(&self, key: &RecordKey) -> UpstreamOutcome<ProductDetails> {
        lookup(&self.details, &self.failing, key.as_str())
    }

    async fn product_offers(&self, key: &RecordKey) -> UpstreamOutcome<ProductOffers> {
        lookup(&self.offers, &self.failing, key.as_str())
    }
}
