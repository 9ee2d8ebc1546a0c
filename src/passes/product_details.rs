use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, FieldCondition, FilterDocument, Predicate};
use crate::upstream::SourceCatalogClient;
use async_trait::async_trait;
use tracing::debug;

/// Fetches title, image and cross-reference identifiers for records whose details were
/// never fetched.
pub struct ProductDetailsPass {
    source_catalog: SourceCatalogClient,
}

impl ProductDetailsPass {
    pub const NAME: &'static str = "product_details";

    pub fn new(source_catalog: SourceCatalogClient) -> Self {
        Self { source_catalog }
    }
}

#[async_trait]
impl Enricher for ProductDetailsPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predicate(&self, _ctx: &PassContext) -> Result<Predicate> {
        Ok(FilterDocument::new()
            .field(Field::DetailsUpdatedAt, FieldCondition::Unset)?
            .into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let details = self
            .source_catalog
            .product_details(&record.key)
            .await?
            .into_option()
            .unwrap_or_default();

        if details.is_blank() {
            debug!(key = %record.key, "No product details found");
        }

        let mut mutation = MutationDescriptor::for_record(record.key).set(FieldUpdate::Details {
            title: details.title,
            image: details.image,
            at: ctx.started_at,
        });
        if !details.identifiers.is_empty() {
            mutation = mutation.set(FieldUpdate::MergeIdentifiers(details.identifiers));
        }
        Ok(Some(mutation))
    }
}
