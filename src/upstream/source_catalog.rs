use super::UpstreamOutcome;
use crate::models::RecordKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Product details from the source catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    /// GTIN / EAN / UPC codes, in the order the catalog lists them.
    pub identifiers: Vec<String>,
    pub title: Option<String>,
    pub image: Option<String>,
}

impl ProductDetails {
    pub fn is_blank(&self) -> bool {
        self.identifiers.is_empty() && self.title.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub seller_id: String,
    pub listing_price: Option<f64>,
    /// First quantity-discount price, used when the listing price is missing.
    pub quantity_discount_price: Option<f64>,
}

impl Offer {
    /// Effective positive price of the offer, if any.
    pub fn effective_price(&self) -> Option<f64> {
        self.listing_price
            .filter(|price| *price > 0.0)
            .or(self.quantity_discount_price)
            .filter(|price| *price > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyBoxPrice {
    pub seller_id: String,
    pub listing_price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductOffers {
    pub offers: Vec<Offer>,
    pub buy_box: Vec<BuyBoxPrice>,
}

/// The source catalog records are purchased from.
#[async_trait]
pub trait SourceCatalogApi: Send + Sync {
    async fn product_details(&self, key: &RecordKey) -> UpstreamOutcome<ProductDetails>;

    async fn product_offers(&self, key: &RecordKey) -> UpstreamOutcome<ProductOffers>;
}
