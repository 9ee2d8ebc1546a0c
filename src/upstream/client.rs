//! Rate-limited, retrying facades over the collaborator traits.
//!
//! Passes never call an adapter directly: each client pairs the adapter with the
//! [`GuardedUpstream`] for its service, so every request waits for a limiter permit and is
//! retried according to its failure reason.

use super::{
    CatalogListing, CatalogProduct, FeeQuery, Fetched, ListingFee, MarketplaceApi,
    ProductDetails, ProductFeed, ProductOffers, ShippingOption, SourceCatalogApi,
};
use crate::error::UpstreamError;
use crate::models::RecordKey;
use crate::resilience::GuardedUpstream;
use std::sync::Arc;

type Call<T> = Result<Fetched<T>, UpstreamError>;

#[derive(Clone)]
pub struct MarketplaceClient {
    api: Arc<dyn MarketplaceApi>,
    guard: GuardedUpstream,
}

impl MarketplaceClient {
    pub fn new(api: Arc<dyn MarketplaceApi>, guard: GuardedUpstream) -> Self {
        Self { api, guard }
    }

    pub fn guard(&self) -> &GuardedUpstream {
        &self.guard
    }

    pub async fn search_catalog(&self, identifier: &str) -> Call<Vec<CatalogProduct>> {
        let api = self.api.as_ref();
        self.guard.call(move || api.search_catalog(identifier)).await
    }

    pub async fn catalog_listings(&self, catalog_id: &str) -> Call<Vec<CatalogListing>> {
        let api = self.api.as_ref();
        self.guard.call(move || api.catalog_listings(catalog_id)).await
    }

    pub async fn item_category(&self, item_id: &str) -> Call<String> {
        let api = self.api.as_ref();
        self.guard.call(move || api.item_category(item_id)).await
    }

    pub async fn listing_fee(&self, query: &FeeQuery) -> Call<ListingFee> {
        let api = self.api.as_ref();
        self.guard.call(move || api.listing_fee(query)).await
    }

    pub async fn shipping_options(
        &self,
        item_id: &str,
        zip_code: &str,
    ) -> Call<Vec<ShippingOption>> {
        let api = self.api.as_ref();
        self.guard
            .call(move || api.shipping_options(item_id, zip_code))
            .await
    }

    pub async fn item_visits(&self, item_id: &str) -> Call<u64> {
        let api = self.api.as_ref();
        self.guard.call(move || api.item_visits(item_id)).await
    }
}

#[derive(Clone)]
pub struct SourceCatalogClient {
    api: Arc<dyn SourceCatalogApi>,
    guard: GuardedUpstream,
}

impl SourceCatalogClient {
    pub fn new(api: Arc<dyn SourceCatalogApi>, guard: GuardedUpstream) -> Self {
        Self { api, guard }
    }

    pub fn guard(&self) -> &GuardedUpstream {
        &self.guard
    }

    pub async fn product_details(&self, key: &RecordKey) -> Call<ProductDetails> {
        let api = self.api.as_ref();
        self.guard.call(move || api.product_details(key)).await
    }

    pub async fn product_offers(&self, key: &RecordKey) -> Call<ProductOffers> {
        let api = self.api.as_ref();
        self.guard.call(move || api.product_offers(key)).await
    }
}

#[derive(Clone)]
pub struct ProductFeedClient {
    api: Arc<dyn ProductFeed>,
    guard: GuardedUpstream,
}

impl ProductFeedClient {
    pub fn new(api: Arc<dyn ProductFeed>, guard: GuardedUpstream) -> Self {
        Self { api, guard }
    }

    pub fn guard(&self) -> &GuardedUpstream {
        &self.guard
    }

    pub async fn tokens_left(&self) -> Call<u64> {
        let api = self.api.as_ref();
        self.guard.call(move || api.tokens_left()).await
    }

    pub async fn discover(&self, category: &str) -> Call<Vec<RecordKey>> {
        let api = self.api.as_ref();
        self.guard.call(move || api.discover(category)).await
    }
}
