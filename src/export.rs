//! # Sheet Export
//!
//! Projects the profitable records into spreadsheet rows and replaces the export range
//! with them. The spreadsheet itself is an external collaborator behind [`Spreadsheet`];
//! its `anyhow` errors are mapped into [`ReconcilerError::Export`] at this seam.

use crate::config::{ExportConfig, SheetsConfig};
use crate::error::{ReconcilerError, Result};
use crate::logging::log_store_operation;
use crate::models::ProductMapping;
use crate::orchestration::CursorPager;
use crate::passes::matched_catalog;
use crate::predicate::{Field, FieldCondition, Predicate};
use crate::store::RecordStore;
use async_trait::async_trait;
use serde_json::{json, Value as Cell};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Page size used when collecting export candidates.
const EXPORT_PAGE_SIZE: usize = 500;

/// Minimal spreadsheet surface: single-column reads, range clears and row writes.
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    /// Non-empty cells of the first column of `range`, top to bottom.
    async fn read_column(&self, spreadsheet_id: &str, range: &str) -> anyhow::Result<Vec<String>>;

    async fn clear(&self, spreadsheet_id: &str, range: &str) -> anyhow::Result<()>;

    /// Formulas in the cells are evaluated by the sheet.
    async fn write(&self, spreadsheet_id: &str, range: &str, rows: Vec<Vec<Cell>>)
        -> anyhow::Result<()>;
}

/// One exported row. Column order matches the sheet header.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub source_link: String,
    pub catalog_link: String,
    pub image: String,
    pub title: String,
    pub source_price: f64,
    pub listing_price: f64,
    pub average_price_30d: f64,
    pub average_price_90d: f64,
    pub average_price_180d: f64,
    pub total_visits_30d: u64,
    pub sale_commission: f64,
    pub shipping_cost: f64,
    pub estimated_profit: f64,
    pub history_len: usize,
}

impl SheetRow {
    pub fn project(record: &ProductMapping, config: &ExportConfig) -> Self {
        let key = record.key.as_str();
        let source_url = config.source_url_template.replace("{key}", key);
        let catalog_link = record
            .catalog_id
            .as_deref()
            .map(|catalog_id| {
                let url = config.catalog_url_template.replace("{catalog_id}", catalog_id);
                hyperlink(&url, catalog_id)
            })
            .unwrap_or_default();

        Self {
            source_link: hyperlink(&source_url, key),
            catalog_link,
            image: record
                .image
                .as_deref()
                .map(|image| format!("=IMAGE(\"{image}\")"))
                .unwrap_or_default(),
            title: record.title.clone().unwrap_or_default(),
            source_price: record.source_price,
            listing_price: record.listing_price,
            average_price_30d: record.average_price_30d,
            average_price_90d: record.average_price_90d,
            average_price_180d: record.average_price_180d,
            total_visits_30d: record.total_visits_30d,
            sale_commission: record.sale_commission,
            shipping_cost: record.shipping_cost,
            estimated_profit: record.estimated_profit,
            history_len: record.price_history.len(),
        }
    }

    pub fn into_cells(self) -> Vec<Cell> {
        vec![
            json!(self.source_link),
            json!(self.catalog_link),
            json!(self.image),
            json!(self.title),
            json!(self.source_price),
            json!(self.listing_price),
            json!(self.average_price_30d),
            json!(self.average_price_90d),
            json!(self.average_price_180d),
            json!(self.total_visits_30d),
            json!(self.sale_commission),
            json!(self.shipping_cost),
            json!(self.estimated_profit),
            json!(self.history_len),
        ]
    }
}

fn hyperlink(url: &str, label: &str) -> String {
    format!("=HYPERLINK(\"{url}\", \"{label}\")")
}

/// Matched, priced, untracked records above the profit and demand thresholds.
pub fn export_predicate(config: &ExportConfig) -> Result<Predicate> {
    Ok(matched_catalog()?
        .field(Field::SourcePrice, FieldCondition::gt(0.0))?
        .field(Field::EstimatedProfit, FieldCondition::gt(config.min_profit))?
        .field(Field::TotalVisits30d, FieldCondition::gte(config.min_visits))?
        .field(Field::Tracking, FieldCondition::eq(false))?
        .into_predicate())
}

/// Rows to export, most profitable first.
pub async fn collect_rows(
    store: Arc<dyn RecordStore>,
    config: &ExportConfig,
) -> Result<Vec<SheetRow>> {
    let mut pager = CursorPager::new(store, export_predicate(config)?, EXPORT_PAGE_SIZE);
    let mut records = Vec::new();
    while let Some(page) = pager.next_page().await? {
        records.extend(page);
    }

    records.sort_by(|a, b| b.estimated_profit.total_cmp(&a.estimated_profit));
    Ok(records
        .iter()
        .map(|record| SheetRow::project(record, config))
        .collect())
}

/// Replace the export range with the current profitable records. Returns the row count.
#[instrument(skip_all, fields(range = %config.range))]
pub async fn export_profitable(
    store: Arc<dyn RecordStore>,
    sheet: &dyn Spreadsheet,
    config: &ExportConfig,
    sheets: &SheetsConfig,
) -> Result<usize> {
    let started = Instant::now();
    let rows = collect_rows(store, config).await?;
    let count = rows.len();
    log_store_operation(
        "export_select",
        count,
        "completed",
        Some(started.elapsed().as_millis() as u64),
        None,
    );

    sheet
        .clear(&sheets.spreadsheet_id, &config.range)
        .await
        .map_err(|e| ReconcilerError::Export(format!("clear {}: {e:#}", config.range)))?;
    sheet
        .write(
            &sheets.spreadsheet_id,
            &config.range,
            rows.into_iter().map(SheetRow::into_cells).collect(),
        )
        .await
        .map_err(|e| ReconcilerError::Export(format!("write {}: {e:#}", config.range)))?;

    info!(rows = count, "📤 Exported profitable records");
    Ok(count)
}
