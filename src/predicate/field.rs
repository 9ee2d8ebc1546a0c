use super::Value;
use crate::models::ProductMapping;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record fields addressable from a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Key,
    Title,
    Image,
    Identifiers,
    DetailsUpdatedAt,
    CatalogId,
    CatalogIdUpdatedAt,
    ItemIds,
    CategoryId,
    CategoryIdUpdatedAt,
    ListingPrice,
    ListingPriceUpdatedAt,
    SaleCommission,
    SaleCommissionUpdatedAt,
    ShippingCost,
    ShippingCostUpdatedAt,
    TotalVisits30d,
    TotalVisitsUpdatedAt,
    SourcePrice,
    SourcePriceUpdatedAt,
    EstimatedProfit,
    IsMatchCorrect,
    Tracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Timestamp,
    Flag,
    Set,
}

impl Field {
    /// Field name; doubles as the column name in the relational store.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Key => "record_key",
            Self::Title => "title",
            Self::Image => "image",
            Self::Identifiers => "identifiers",
            Self::DetailsUpdatedAt => "details_updated_at",
            Self::CatalogId => "catalog_id",
            Self::CatalogIdUpdatedAt => "catalog_id_updated_at",
            Self::ItemIds => "item_ids",
            Self::CategoryId => "category_id",
            Self::CategoryIdUpdatedAt => "category_id_updated_at",
            Self::ListingPrice => "listing_price",
            Self::ListingPriceUpdatedAt => "listing_price_updated_at",
            Self::SaleCommission => "sale_commission",
            Self::SaleCommissionUpdatedAt => "sale_commission_updated_at",
            Self::ShippingCost => "shipping_cost",
            Self::ShippingCostUpdatedAt => "shipping_cost_updated_at",
            Self::TotalVisits30d => "total_visits_30d",
            Self::TotalVisitsUpdatedAt => "total_visits_updated_at",
            Self::SourcePrice => "source_price",
            Self::SourcePriceUpdatedAt => "source_price_updated_at",
            Self::EstimatedProfit => "estimated_profit",
            Self::IsMatchCorrect => "is_match_correct",
            Self::Tracking => "tracking",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Key | Self::Title | Self::Image | Self::CatalogId | Self::CategoryId => {
                FieldKind::Text
            }
            Self::Identifiers | Self::ItemIds => FieldKind::Set,
            Self::ListingPrice
            | Self::SaleCommission
            | Self::ShippingCost
            | Self::TotalVisits30d
            | Self::SourcePrice
            | Self::EstimatedProfit => FieldKind::Number,
            Self::IsMatchCorrect | Self::Tracking => FieldKind::Flag,
            Self::DetailsUpdatedAt
            | Self::CatalogIdUpdatedAt
            | Self::CategoryIdUpdatedAt
            | Self::ListingPriceUpdatedAt
            | Self::SaleCommissionUpdatedAt
            | Self::ShippingCostUpdatedAt
            | Self::TotalVisitsUpdatedAt
            | Self::SourcePriceUpdatedAt => FieldKind::Timestamp,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ProductMapping {
    /// Current value of `field`, as seen by predicate evaluation.
    pub fn field_value(&self, field: Field) -> Value {
        match field {
            Field::Key => Value::Text(self.key.as_str().to_string()),
            Field::Title => Value::from(self.title.as_deref()),
            Field::Image => Value::from(self.image.as_deref()),
            Field::Identifiers => Value::List(self.identifiers.as_slice().to_vec()),
            Field::DetailsUpdatedAt => Value::from(self.details_updated_at),
            Field::CatalogId => Value::from(self.catalog_id.as_deref()),
            Field::CatalogIdUpdatedAt => Value::from(self.catalog_id_updated_at),
            Field::ItemIds => Value::List(self.item_ids.as_slice().to_vec()),
            Field::CategoryId => Value::from(self.category_id.as_deref()),
            Field::CategoryIdUpdatedAt => Value::from(self.category_id_updated_at),
            Field::ListingPrice => Value::Number(self.listing_price),
            Field::ListingPriceUpdatedAt => Value::from(self.listing_price_updated_at),
            Field::SaleCommission => Value::Number(self.sale_commission),
            Field::SaleCommissionUpdatedAt => Value::from(self.sale_commission_updated_at),
            Field::ShippingCost => Value::Number(self.shipping_cost),
            Field::ShippingCostUpdatedAt => Value::from(self.shipping_cost_updated_at),
            Field::TotalVisits30d => Value::Number(self.total_visits_30d as f64),
            Field::TotalVisitsUpdatedAt => Value::from(self.total_visits_updated_at),
            Field::SourcePrice => Value::Number(self.source_price),
            Field::SourcePriceUpdatedAt => Value::from(self.source_price_updated_at),
            Field::EstimatedProfit => Value::Number(self.estimated_profit),
            Field::IsMatchCorrect => Value::Bool(self.is_match_correct),
            Field::Tracking => Value::Bool(self.tracking),
        }
    }
}
