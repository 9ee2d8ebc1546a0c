use super::stale_clauses;
use crate::error::Result;
use crate::models::{FieldUpdate, MutationDescriptor, ProductMapping};
use crate::orchestration::{Enricher, EnrichmentResult, PassContext};
use crate::predicate::{Field, FieldCondition, FilterDocument, Predicate};
use crate::upstream::{Fetched, MarketplaceClient};
use async_trait::async_trait;
use chrono::Duration;
use tracing::{debug, warn};

/// Matches records to a marketplace catalog product.
///
/// Identifiers are searched in insertion order and the first one with a hit wins. A record
/// with no hit is stamped as checked and is searched again once `recheck_after` elapses.
pub struct CatalogIdsPass {
    marketplace: MarketplaceClient,
    recheck_after: Duration,
}

impl CatalogIdsPass {
    pub const NAME: &'static str = "catalog_ids";

    pub fn new(marketplace: MarketplaceClient, recheck_after: Duration) -> Self {
        Self {
            marketplace,
            recheck_after,
        }
    }
}

#[async_trait]
impl Enricher for CatalogIdsPass {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn predicate(&self, ctx: &PassContext) -> Result<Predicate> {
        Ok(FilterDocument::new()
            .field(Field::Identifiers, FieldCondition::Set)?
            .field(Field::CatalogId, FieldCondition::Unset)?
            .any_of(stale_clauses(
                Field::CatalogIdUpdatedAt,
                ctx.started_at - self.recheck_after,
            ))?
            .into_predicate())
    }

    async fn enrich(&self, record: ProductMapping, ctx: &PassContext) -> EnrichmentResult {
        let mut last_error = None;

        for identifier in record.identifiers.iter() {
            match self.marketplace.search_catalog(identifier).await {
                Ok(Fetched::Value(products)) => {
                    if let Some(product) = products.into_iter().next() {
                        debug!(key = %record.key, identifier, catalog_id = %product.id, "Catalog match found");
                        return Ok(Some(MutationDescriptor::for_record(record.key).set(
                            FieldUpdate::CatalogMatch {
                                catalog_id: Some(product.id),
                                catalog_identifier: Some(identifier.to_string()),
                                at: ctx.started_at,
                            },
                        )));
                    }
                }
                Ok(Fetched::Empty) => {}
                Err(error) => {
                    warn!(key = %record.key, identifier, error = %error, "Catalog search failed");
                    last_error = Some(error);
                }
            }
        }

        // "No match" is only recorded when every identifier was actually checked.
        if let Some(error) = last_error {
            return Err(error.into());
        }

        debug!(key = %record.key, "No catalog match for any identifier");
        Ok(Some(MutationDescriptor::for_record(record.key).set(
            FieldUpdate::CatalogMatch {
                catalog_id: None,
                catalog_identifier: None,
                at: ctx.started_at,
            },
        )))
    }
}
