use super::UpstreamOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Catalog product returned by an identifier search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
}

/// Active listing under a catalog product, in marketplace ranking order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogListing {
    pub item_id: String,
    pub price: f64,
}

/// Sale fee for a category, as a percentage (`15.0` means 15%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListingFee {
    pub percentage_fee: f64,
}

impl ListingFee {
    pub fn rate(&self) -> f64 {
        self.percentage_fee / 100.0
    }
}

/// Fee lookup for a category at a reference price and listing type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeQuery {
    pub category_id: String,
    pub price: f64,
    pub listing_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub name: String,
    pub base_cost: f64,
    pub list_cost: f64,
}

/// The listing marketplace (catalog search, listings, fees, shipping, visits).
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Active catalog products carrying `identifier` (GTIN/EAN/UPC).
    async fn search_catalog(&self, identifier: &str) -> UpstreamOutcome<Vec<CatalogProduct>>;

    /// Active listings of a catalog product; the first one is the buy-box winner.
    async fn catalog_listings(&self, catalog_id: &str) -> UpstreamOutcome<Vec<CatalogListing>>;

    async fn item_category(&self, item_id: &str) -> UpstreamOutcome<String>;

    async fn listing_fee(&self, query: &FeeQuery) -> UpstreamOutcome<ListingFee>;

    /// Shipping options of an item to the given destination zip code.
    async fn shipping_options(
        &self,
        item_id: &str,
        zip_code: &str,
    ) -> UpstreamOutcome<Vec<ShippingOption>>;

    /// Visits of an item over the trailing 30 days.
    async fn item_visits(&self, item_id: &str) -> UpstreamOutcome<u64>;
}
