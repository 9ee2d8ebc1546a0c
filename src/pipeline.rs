//! # Reconciliation Pipeline
//!
//! One full reconciliation run: discovery, every enrichment pass in dependency order,
//! then the sheet export.
//!
//! ## Key Features
//!
//! - **Shared limits**: one [`GuardedUpstream`] per upstream service, cloned into every pass,
//!   so concurrent workers of all passes stay inside a single rate budget per service
//! - **Fresh start times**: each pass reads the clock when it starts; staleness cutoffs and
//!   written timestamps come from that instant
//! - **Failure policy**: a pass-fatal error
//!   ([`ReconcilerError::is_pass_fatal`](crate::error::ReconcilerError::is_pass_fatal))
//!   aborts the run; any other stage error is logged and recorded in the report
//! - **Cancellation**: checked between stages and between pages

use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::export::{export_profitable, Spreadsheet};
use crate::logging::{log_error, log_pass_operation};
use crate::maintenance::{
    discover_new_records, flag_incorrect_matches_from_sheet, import_keys_from_sheet,
    sync_tracking_from_sheet, DiscoveryReport, TrackingSync,
};
use crate::orchestration::{Clock, Enricher, PassSummary, ReconciliationPass};
use crate::passes::{
    CatalogIdsPass, CategoryIdsPass, FeeCache, ListingPricesPass, ProductDetailsPass, ProfitPass,
    SaleFeesPass, ShippingCostsPass, ShippingSchedule, SourcePriceSelection, SourcePricesPass,
    VisitsPass,
};
use crate::resilience::GuardedUpstream;
use crate::store::RecordStore;
use crate::upstream::{
    MarketplaceApi, MarketplaceClient, ProductFeed, ProductFeedClient, SourceCatalogApi,
    SourceCatalogClient,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// External services a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub marketplace: Arc<dyn MarketplaceApi>,
    pub source_catalog: Arc<dyn SourceCatalogApi>,
    pub product_feed: Arc<dyn ProductFeed>,
    pub sheet: Arc<dyn Spreadsheet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutcome {
    Discovery(DiscoveryReport),
    Pass(PassSummary),
    Export { rows: usize },
    /// Non-fatal stage failure; the run continued.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub stages: Vec<StageReport>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn pass(&self, name: &str) -> Option<&PassSummary> {
        self.stages.iter().find_map(|stage| match &stage.outcome {
            StageOutcome::Pass(summary) if summary.pass_name == name => Some(summary),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageReport> {
        self.stages
            .iter()
            .filter(|stage| matches!(stage.outcome, StageOutcome::Failed { .. }))
    }
}

/// Result of mirroring the sheet-managed lists into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSync {
    pub imported: usize,
    pub flagged_incorrect: usize,
    pub tracking: TrackingSync,
}

pub const DISCOVERY_STAGE: &str = "discovery";
pub const EXPORT_STAGE: &str = "export";

pub struct ReconciliationPipeline {
    config: ReconcilerConfig,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    marketplace: MarketplaceClient,
    source_catalog: SourceCatalogClient,
    product_feed: ProductFeedClient,
    sheet: Arc<dyn Spreadsheet>,
    cancel: CancellationToken,
}

impl ReconciliationPipeline {
    pub fn new(
        config: ReconcilerConfig,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        collaborators: Collaborators,
    ) -> Self {
        let guard = |service: &str, limits| {
            GuardedUpstream::new(service, limits, config.retry.clone())
        };
        let marketplace = MarketplaceClient::new(
            collaborators.marketplace,
            guard("marketplace", config.rate_limits.marketplace.clone()),
        );
        let source_catalog = SourceCatalogClient::new(
            collaborators.source_catalog,
            guard("source_catalog", config.rate_limits.source_catalog.clone()),
        );
        let product_feed = ProductFeedClient::new(
            collaborators.product_feed,
            guard("product_feed", config.rate_limits.product_feed.clone()),
        );

        Self {
            config,
            store,
            clock,
            marketplace,
            source_catalog,
            product_feed,
            sheet: collaborators.sheet,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between stages, and between pages of the running pass, once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn marketplace(&self) -> &MarketplaceClient {
        &self.marketplace
    }

    pub fn source_catalog(&self) -> &SourceCatalogClient {
        &self.source_catalog
    }

    pub fn product_feed(&self) -> &ProductFeedClient {
        &self.product_feed
    }

    /// The enrichment passes of a full run, in execution order. Each call builds a fresh
    /// fee cache.
    pub fn passes(&self) -> Vec<Box<dyn Enricher>> {
        let staleness = &self.config.staleness;
        let settings = &self.config.marketplace;
        let sellers = settings.accepted_seller_ids.clone();

        vec![
            Box::new(ProductDetailsPass::new(self.source_catalog.clone())) as Box<dyn Enricher>,
            Box::new(CatalogIdsPass::new(
                self.marketplace.clone(),
                staleness.catalog_id(),
            )),
            Box::new(ListingPricesPass::new(
                self.marketplace.clone(),
                staleness.clone(),
            )),
            Box::new(CategoryIdsPass::new(self.marketplace.clone())),
            Box::new(SaleFeesPass::new(
                self.marketplace.clone(),
                settings.clone(),
                Arc::new(FeeCache::new()),
            )),
            Box::new(ShippingCostsPass::new(
                self.marketplace.clone(),
                settings.clone(),
                self.config.profit.default_shipping_cost,
                ShippingSchedule::Daily,
            )),
            Box::new(VisitsPass::new(self.marketplace.clone(), staleness.visits())),
            Box::new(SourcePricesPass::new(
                self.source_catalog.clone(),
                sellers.clone(),
                SourcePriceSelection::Untracked {
                    min_visits: self.config.export.min_visits,
                    refresh_after: staleness.source_price(),
                },
            )),
            Box::new(SourcePricesPass::new(
                self.source_catalog.clone(),
                sellers,
                SourcePriceSelection::Tracked {
                    refresh_after: staleness.tracked_refresh(),
                },
            )),
            Box::new(ProfitPass::new(self.config.profit.clone())),
        ]
    }

    /// Run one pass against the shared store with the pipeline's cancellation token.
    pub async fn run_pass(&self, enricher: &dyn Enricher) -> Result<PassSummary> {
        ReconciliationPass::new(
            Arc::clone(&self.store),
            &self.config.engine,
            Arc::clone(&self.clock),
        )
        .with_cancellation(self.cancel.clone())
        .run(enricher)
        .await
    }

    /// Refresh shipping costs older than the monthly interval. Not part of [`Self::run`].
    pub async fn run_monthly_shipping(&self) -> Result<PassSummary> {
        let pass = ShippingCostsPass::new(
            self.marketplace.clone(),
            self.config.marketplace.clone(),
            self.config.profit.default_shipping_cost,
            ShippingSchedule::Monthly {
                refresh_after: self.config.staleness.shipping_monthly(),
            },
        );
        self.run_pass(&pass).await
    }

    /// Import new keys, flag incorrect matches and mirror the tracking list.
    #[instrument(skip_all)]
    pub async fn sync_sheets(&self) -> Result<SheetSync> {
        let sheets = &self.config.sheets;
        let sheet = self.sheet.as_ref();

        let imported =
            import_keys_from_sheet(sheet, self.store.as_ref(), sheets, self.clock.now()).await?;
        let flagged_incorrect =
            flag_incorrect_matches_from_sheet(sheet, self.store.as_ref(), sheets).await?;
        let tracking = sync_tracking_from_sheet(sheet, Arc::clone(&self.store), sheets).await?;

        Ok(SheetSync {
            imported,
            flagged_incorrect,
            tracking,
        })
    }

    /// Discovery, every pass from [`Self::passes`], then export.
    #[instrument(skip_all)]
    pub async fn run(&self) -> Result<PipelineReport> {
        let mut report = PipelineReport {
            run_id: Uuid::new_v4(),
            stages: Vec::new(),
            cancelled: false,
            started_at: self.clock.now(),
            finished_at: self.clock.now(),
        };
        let run_id = report.run_id.to_string();
        log_pass_operation("pipeline", "all", Some(&run_id), "started", None);

        let discovery = discover_new_records(
            &self.product_feed,
            self.store.as_ref(),
            &self.config.discovery,
            self.clock.now(),
        )
        .await
        .map(StageOutcome::Discovery);
        self.record(&mut report, DISCOVERY_STAGE, discovery)?;

        for pass in self.passes() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let summary = self.run_pass(pass.as_ref()).await;
            let stopped = matches!(&summary, Ok(summary) if summary.cancelled);
            self.record(&mut report, pass.name(), summary.map(StageOutcome::Pass))?;
            if stopped {
                report.cancelled = true;
                break;
            }
        }

        if !report.cancelled && !self.cancel.is_cancelled() {
            let export = export_profitable(
                Arc::clone(&self.store),
                self.sheet.as_ref(),
                &self.config.export,
                &self.config.sheets,
            )
            .await
            .map(|rows| StageOutcome::Export { rows });
            self.record(&mut report, EXPORT_STAGE, export)?;
        } else {
            report.cancelled = true;
            info!(stages = report.stages.len(), "🛑 Pipeline cancelled");
        }

        report.finished_at = self.clock.now();
        let details = format!(
            "stages={} failures={}",
            report.stages.len(),
            report.failures().count()
        );
        log_pass_operation(
            "pipeline",
            "all",
            Some(&run_id),
            if report.cancelled { "cancelled" } else { "completed" },
            Some(&details),
        );
        Ok(report)
    }

    /// Append a stage outcome; a pass-fatal error ends the run.
    fn record(
        &self,
        report: &mut PipelineReport,
        stage: &str,
        outcome: Result<StageOutcome>,
    ) -> Result<()> {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(error) if error.is_pass_fatal() => {
                log_error("pipeline", stage, &error.to_string(), Some("aborting run"));
                return Err(error);
            }
            Err(error) => {
                warn!(stage, error = %error, "Stage failed, continuing with the next one");
                StageOutcome::Failed {
                    error: error.to_string(),
                }
            }
        };
        report.stages.push(StageReport {
            stage: stage.to_string(),
            outcome,
        });
        Ok(())
    }
}

impl std::fmt::Debug for ReconciliationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationPipeline")
            .field("engine", &self.config.engine)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

