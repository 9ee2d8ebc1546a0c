use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, FieldCondition, FilterDocument, Predicate};
use crate::upstream::MarketplaceClient;
use async_trait::async_trait;

/// Resolves the marketplace category from the record's first known item.
pub struct CategoryIdsPass {
    marketplace: MarketplaceClient,
}

impl CategoryIdsPass {
    pub const NAME: &'static str = "category_ids";

    pub fn new(marketplace: MarketplaceClient) -> Self {
        Self { marketplace }
    }
}

#[async_trait]
impl Enricher for CategoryIdsPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predicate(&self, _ctx: &PassContext) -> Result<Predicate> {
        Ok(FilterDocument::new()
            .field(Field::ItemIds, FieldCondition::Set)?
            .field(Field::CategoryIdUpdatedAt, FieldCondition::Unset)?
            .into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let Some(item_id) = record.item_ids.first() else {
            return Ok(None);
        };

        let category_id = self
            .marketplace
            .item_category(item_id)
            .await?
            .into_option()
            .filter(|category| !category.is_empty());

        Ok(Some(MutationDescriptor::for_record(record.key).set(
            FieldUpdate::Category {
                category_id,
                at: ctx.started_at,
            },
        )))
    }
}
