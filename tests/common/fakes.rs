//! Scripted upstream services and an in-memory spreadsheet.
//!
//! Unknown ids answer `NotFound` (a domain-empty result); ids registered with
//! `failing_on` answer a non-retryable failure.

use async_trait::async_trait;
use parking_lot::Mutex;
use reconciler_core::export::Spreadsheet;
use reconciler_core::models::RecordKey;
use reconciler_core::upstream::{
    BuyBoxPrice, CatalogListing, CatalogProduct, FeeQuery, ListingFee, MarketplaceApi, Offer,
    ProductDetails, ProductFeed, ProductOffers, ShippingOption, SourceCatalogApi, UpstreamOutcome,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Table<T> {
    values: Mutex<HashMap<String, T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> Table<T> {
    fn insert(&self, id: &str, value: T) {
        self.values.lock().insert(id.to_string(), value);
    }

    fn answer(&self, failing: &Mutex<HashSet<String>>, id: &str) -> UpstreamOutcome<T> {
        if failing.lock().contains(id) {
            return UpstreamOutcome::other(format!("{id} unavailable"));
        }
        match self.values.lock().get(id) {
            Some(value) => UpstreamOutcome::Ok(value.clone()),
            None => UpstreamOutcome::not_found(),
        }
    }
}

#[derive(Default)]
pub struct ScriptedMarketplace {
    search: Table<Vec<CatalogProduct>>,
    listings: Table<Vec<CatalogListing>>,
    categories: Table<String>,
    fees: Table<ListingFee>,
    shipping: Table<Vec<ShippingOption>>,
    visits: Table<u64>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedMarketplace {
    pub fn with_catalog(self, identifier: &str, catalog_id: &str) -> Self {
        self.search.insert(
            identifier,
            vec![CatalogProduct {
                id: catalog_id.to_string(),
            }],
        );
        self
    }

    pub fn with_listings(self, catalog_id: &str, listings: &[(&str, f64)]) -> Self {
        self.listings.insert(
            catalog_id,
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
        self.categories.insert(item_id, category_id.to_string());
        self
    }

    pub fn with_fee(self, category_id: &str, percentage_fee: f64) -> Self {
        self.fees.insert(category_id, ListingFee { percentage_fee });
        self
    }

    pub fn with_standard_shipping(self, item_id: &str, list_cost: f64) -> Self {
        self.shipping.insert(
            item_id,
            vec![ShippingOption {
                name: "Estándar a domicilio".to_string(),
                base_cost: list_cost,
                list_cost,
            }],
        );
        self
    }

    pub fn with_visits(self, item_id: &str, visits: u64) -> Self {
        self.visits.insert(item_id, visits);
        self
    }

    pub fn failing_on(self, id: &str) -> Self {
        self.failing.lock().insert(id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketplaceApi for ScriptedMarketplace {
    async fn search_catalog(&self, identifier: &str) -> UpstreamOutcome<Vec<CatalogProduct>> {
        self.count();
        self.search.answer(&self.failing, identifier)
    }

    async fn catalog_listings(&self, catalog_id: &str) -> UpstreamOutcome<Vec<CatalogListing>> {
        self.count();
        self.listings.answer(&self.failing, catalog_id)
    }

    async fn item_category(&self, item_id: &str) -> UpstreamOutcome<String> {
        self.count();
        self.categories.answer(&self.failing, item_id)
    }

    async fn listing_fee(&self, query: &FeeQuery) -> UpstreamOutcome<ListingFee> {
        self.count();
        self.fees.answer(&self.failing, &query.category_id)
    }

    async fn shipping_options(
        &self,
        item_id: &str,
        _zip_code: &str,
    ) -> UpstreamOutcome<Vec<ShippingOption>> {
        self.count();
        self.shipping.answer(&self.failing, item_id)
    }

    async fn item_visits(&self, item_id: &str) -> UpstreamOutcome<u64> {
        self.count();
        self.visits.answer(&self.failing, item_id)
    }
}

#[derive(Default)]
pub struct ScriptedSourceCatalog {
    details: Table<ProductDetails>,
    offers: Table<ProductOffers>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedSourceCatalog {
    pub fn with_details(self, key: &str, title: &str, identifiers: &[&str]) -> Self {
        self.details.insert(
            key,
            ProductDetails {
                identifiers: identifiers.iter().map(|id| id.to_string()).collect(),
                title: Some(title.to_string()),
                image: Some(format!("https://images.example/{key}.jpg")),
            },
        );
        self
    }

    /// A single accepted-seller offer plus a buy box from the same seller.
    pub fn with_price(self, key: &str, seller_id: &str, price: f64) -> Self {
        self.offers.insert(
            key,
            ProductOffers {
                offers: vec![Offer {
                    seller_id: seller_id.to_string(),
                    listing_price: Some(price),
                    quantity_discount_price: None,
                }],
                buy_box: vec![BuyBoxPrice {
                    seller_id: seller_id.to_string(),
                    listing_price: price,
                }],
            },
        );
        self
    }

    pub fn failing_on(self, key: &str) -> Self {
        self.failing.lock().insert(key.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceCatalogApi for ScriptedSourceCatalog {
    async fn product_details(&self, key: &RecordKey) -> UpstreamOutcome<ProductDetails> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.details.answer(&self.failing, key.as_str())
    }

    async fn product_offers(&self, key: &RecordKey) -> UpstreamOutcome<ProductOffers> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.offers.answer(&self.failing, key.as_str())
    }
}

pub struct ScriptedFeed {
    tokens: u64,
    categories: Table<Vec<RecordKey>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedFeed {
    pub fn with_tokens(tokens: u64) -> Self {
        Self {
            tokens,
            categories: Table::default(),
            failing: Mutex::default(),
        }
    }

    pub fn with_category(self, category: &str, keys: &[&str]) -> Self {
        self.categories
            .insert(category, keys.iter().copied().map(RecordKey::from).collect());
        self
    }
}

#[async_trait]
impl ProductFeed for ScriptedFeed {
    async fn tokens_left(&self) -> UpstreamOutcome<u64> {
        UpstreamOutcome::Ok(self.tokens)
    }

    async fn discover(&self, category: &str) -> UpstreamOutcome<Vec<RecordKey>> {
        self.categories.answer(&self.failing, category)
    }
}

/// Ranges map to a single column of cells; writes replace the rows of a range.
#[derive(Default)]
pub struct MemorySheet {
    columns: Mutex<HashMap<String, Vec<String>>>,
    rows: Mutex<HashMap<String, Vec<Vec<Value>>>>,
    offline: bool,
}

impl MemorySheet {
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_column(self, range: &str, cells: &[&str]) -> Self {
        self.columns
            .lock()
            .insert(range.to_string(), cells.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn column(&self, range: &str) -> Vec<String> {
        self.columns.lock().get(range).cloned().unwrap_or_default()
    }

    pub fn rows(&self, range: &str) -> Vec<Vec<Value>> {
        self.rows.lock().get(range).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Spreadsheet for MemorySheet {
    async fn read_column(&self, _spreadsheet_id: &str, range: &str) -> anyhow::Result<Vec<String>> {
        if self.offline {
            anyhow::bail!("spreadsheet offline");
        }
        Ok(self.column(range))
    }

    async fn clear(&self, _spreadsheet_id: &str, range: &str) -> anyhow::Result<()> {
        if self.offline {
            anyhow::bail!("spreadsheet offline");
        }
        self.columns.lock().remove(range);
        self.rows.lock().remove(range);
        Ok(())
    }

    async fn write(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> anyhow::Result<()> {
        if self.offline {
            anyhow::bail!("spreadsheet offline");
        }
        self.rows.lock().insert(range.to_string(), rows);
        Ok(())
    }
}
