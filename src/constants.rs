//! # System Constants
//!
//! Environment variable names, configuration file locations and the stage order of a
//! full reconciliation run.

use crate::passes::{
    CatalogIdsPass, CategoryIdsPass, ListingPricesPass, ProductDetailsPass, ProfitPass,
    SaleFeesPass, ShippingCostsPass, SourcePricesPass, VisitsPass,
};
use crate::pipeline::{DISCOVERY_STAGE, EXPORT_STAGE};

/// Environment variables read by configuration and logging.
pub mod env {
    /// Deployment environment (`development`, `test`, `production`).
    pub const ENVIRONMENT: &str = "RECONCILER_ENV";
    /// Checked when [`ENVIRONMENT`] is not set.
    pub const FALLBACK_ENVIRONMENT: &str = "APP_ENV";
    pub const DEFAULT_ENVIRONMENT: &str = "development";

    /// Explicit configuration file; must exist when set.
    pub const CONFIG_PATH: &str = "RECONCILER_CONFIG_PATH";
    pub const DEFAULT_CONFIG_FILE: &str = "config/reconciler.toml";

    /// Prefix of value overrides, e.g. `RECONCILER_ENGINE__PAGE_SIZE=50`.
    pub const OVERRIDE_PREFIX: &str = "RECONCILER";
    pub const OVERRIDE_SEPARATOR: &str = "__";

    /// Resolve the current environment name.
    pub fn current() -> String {
        std::env::var(ENVIRONMENT)
            .or_else(|_| std::env::var(FALLBACK_ENVIRONMENT))
            .unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string())
    }
}

/// Stages of [`crate::pipeline::ReconciliationPipeline::run`], in execution order.
pub const PIPELINE_ORDER: [&str; 12] = [
    DISCOVERY_STAGE,
    ProductDetailsPass::NAME,
    CatalogIdsPass::NAME,
    ListingPricesPass::NAME,
    CategoryIdsPass::NAME,
    SaleFeesPass::NAME,
    ShippingCostsPass::DAILY,
    VisitsPass::NAME,
    SourcePricesPass::UNTRACKED,
    SourcePricesPass::TRACKED,
    ProfitPass::NAME,
    EXPORT_STAGE,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn stage_names_are_unique() {
        let unique: HashSet<_> = PIPELINE_ORDER.iter().collect();
        assert_eq!(unique.len(), PIPELINE_ORDER.len());
    }
}
