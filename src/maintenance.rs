//! # Maintenance
//!
//! Record-set upkeep that runs outside the enrichment passes: discovering new keys from
//! the product feed, importing keys pasted into a sheet, and mirroring the sheet-managed
//! control flags (`tracking`, `is_match_correct`) into the store.

use crate::config::{DiscoveryConfig, SheetsConfig};
use crate::error::{ReconcilerError, Result};
use crate::export::Spreadsheet;
use crate::models::{ControlFlag, RecordKey};
use crate::orchestration::CursorPager;
use crate::predicate::{Field, Predicate};
use crate::store::RecordStore;
use crate::upstream::{Fetched, ProductFeedClient};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const TRACKED_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub tokens_left: u64,
    /// Too few feed tokens; no category was queried.
    pub skipped: bool,
    pub categories_failed: usize,
    /// Distinct keys returned across all categories.
    pub candidates: usize,
    pub inserted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSync {
    pub tracked: usize,
    pub untracked: usize,
}

/// Query every configured category of the product feed and insert the keys not yet stored.
///
/// A failed category is logged and left out; the token check failing aborts discovery.
#[instrument(skip_all, fields(categories = config.categories.len()))]
pub async fn discover_new_records(
    feed: &ProductFeedClient,
    store: &dyn RecordStore,
    config: &DiscoveryConfig,
    now: DateTime<Utc>,
) -> Result<DiscoveryReport> {
    let tokens_left = feed
        .tokens_left()
        .await
        .map_err(|e| ReconcilerError::Discovery(format!("token check failed: {e}")))?
        .into_option()
        .unwrap_or(0);

    let mut report = DiscoveryReport {
        tokens_left,
        ..DiscoveryReport::default()
    };
    if tokens_left < config.min_feed_tokens {
        info!(
            tokens_left,
            required = config.min_feed_tokens,
            "⏸️ Not enough feed tokens, skipping discovery"
        );
        report.skipped = true;
        return Ok(report);
    }

    let answers = join_all(
        config
            .categories
            .iter()
            .map(|category| async move { (category, feed.discover(category).await) }),
    )
    .await;

    let mut candidates = BTreeSet::new();
    for (category, answer) in answers {
        match answer {
            Ok(Fetched::Value(keys)) => {
                debug!(category = %category, found = keys.len(), "Category discovered");
                candidates.extend(keys);
            }
            Ok(Fetched::Empty) => debug!(category = %category, "Category returned nothing"),
            Err(error) => {
                warn!(category = %category, error = %error, "Category discovery failed");
                report.categories_failed += 1;
            }
        }
    }

    let keys: Vec<RecordKey> = candidates.into_iter().collect();
    report.candidates = keys.len();
    report.inserted = store.insert_missing(&keys, now).await?;
    info!(
        candidates = report.candidates,
        inserted = report.inserted,
        "🔍 Discovery completed"
    );
    Ok(report)
}

/// Insert the keys listed in the new-keys range. The range is cleared once anything new
/// was inserted. Returns the number of inserted records.
#[instrument(skip_all, fields(range = %sheets.new_keys_range))]
pub async fn import_keys_from_sheet(
    sheet: &dyn Spreadsheet,
    store: &dyn RecordStore,
    sheets: &SheetsConfig,
    now: DateTime<Utc>,
) -> Result<usize> {
    let keys = read_keys(sheet, &sheets.spreadsheet_id, &sheets.new_keys_range).await?;
    if keys.is_empty() {
        debug!("No keys listed in the sheet");
        return Ok(0);
    }

    let keys: Vec<RecordKey> = keys.into_iter().collect();
    let inserted = store.insert_missing(&keys, now).await?;
    if inserted > 0 {
        clear_range(sheet, &sheets.spreadsheet_id, &sheets.new_keys_range).await?;
    }
    info!(listed = keys.len(), inserted, "📥 Imported keys from sheet");
    Ok(inserted)
}

/// Make the `tracking` flag mirror the tracking list: listed keys are tracked, every
/// other tracked record is untracked.
#[instrument(skip_all, fields(range = %sheets.tracking_range))]
pub async fn sync_tracking_from_sheet(
    sheet: &dyn Spreadsheet,
    store: Arc<dyn RecordStore>,
    sheets: &SheetsConfig,
) -> Result<TrackingSync> {
    let listed = read_keys(sheet, sheets.tracking_spreadsheet(), &sheets.tracking_range).await?;

    let mut pager = CursorPager::new(
        Arc::clone(&store),
        Predicate::eq(Field::Tracking, true),
        TRACKED_PAGE_SIZE,
    );
    let mut unlisted = Vec::new();
    while let Some(page) = pager.next_page().await? {
        unlisted.extend(
            page.into_iter()
                .map(|record| record.key)
                .filter(|key| !listed.contains(key)),
        );
    }

    let listed: Vec<RecordKey> = listed.into_iter().collect();
    let sync = TrackingSync {
        tracked: store.set_flag(&listed, ControlFlag::Tracking, true).await?,
        untracked: store.set_flag(&unlisted, ControlFlag::Tracking, false).await?,
    };
    info!(
        listed = listed.len(),
        tracked = sync.tracked,
        untracked = sync.untracked,
        "📌 Tracking synchronised"
    );
    Ok(sync)
}

/// Flag the listed keys as wrong catalog matches, then clear the range.
/// Returns the number of records that changed.
#[instrument(skip_all, fields(range = %sheets.incorrect_matches_range))]
pub async fn flag_incorrect_matches_from_sheet(
    sheet: &dyn Spreadsheet,
    store: &dyn RecordStore,
    sheets: &SheetsConfig,
) -> Result<usize> {
    let keys = read_keys(
        sheet,
        &sheets.spreadsheet_id,
        &sheets.incorrect_matches_range,
    )
    .await?;
    if keys.is_empty() {
        return Ok(0);
    }

    let keys: Vec<RecordKey> = keys.into_iter().collect();
    let changed = store.set_flag(&keys, ControlFlag::MatchCorrect, false).await?;
    clear_range(sheet, &sheets.spreadsheet_id, &sheets.incorrect_matches_range).await?;
    info!(listed = keys.len(), changed, "🚩 Incorrect matches flagged");
    Ok(changed)
}

/// Distinct, trimmed, non-blank keys of a sheet column.
async fn read_keys(
    sheet: &dyn Spreadsheet,
    spreadsheet_id: &str,
    range: &str,
) -> Result<BTreeSet<RecordKey>> {
    let cells = sheet
        .read_column(spreadsheet_id, range)
        .await
        .map_err(|e| ReconcilerError::Export(format!("read {range}: {e:#}")))?;

    Ok(cells
        .iter()
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(RecordKey::from)
        .collect())
}

async fn clear_range(sheet: &dyn Spreadsheet, spreadsheet_id: &str, range: &str) -> Result<()> {
    sheet
        .clear(spreadsheet_id, range)
        .await
        .map_err(|e| ReconcilerError::Export(format!("clear {range}: {e:#}")))
}
