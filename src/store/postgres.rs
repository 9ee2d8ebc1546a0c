//! # PostgreSQL Record Store
//!
//! Records live in one `product_mappings` table keyed by `record_key`. Set-valued fields
//! are `TEXT[]` and the price history is a JSONB array of `{price, recorded_at}` objects.
//!
//! A bulk write runs in a single transaction: the affected rows are locked with
//! `SELECT ... FOR UPDATE`, mutated with [`ProductMapping::apply`] and written back, so the
//! union and append semantics are exactly those of the in-memory store.
//!
//! Keys sort by byte order (`COLLATE "C"`), the order [`RecordKey`] compares in. Page
//! queries spell the collation out as well, so tables created under the database's default
//! collation page in the same order.

use super::{BulkWriteSummary, RecordStore};
use crate::error::{ReconcilerError, Result};
use crate::models::{ControlFlag, MutationDescriptor, PriceSample, ProductMapping, RecordKey};
use crate::predicate::{Field, Predicate};
use crate::query_builder::{KeysetPagination, QueryBuilder};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

pub const TABLE: &str = "product_mappings";

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS product_mappings (
    record_key                 TEXT COLLATE "C" PRIMARY KEY,
    title                      TEXT,
    image                      TEXT,
    identifiers                TEXT[] NOT NULL DEFAULT '{}',
    details_updated_at         TIMESTAMPTZ,
    catalog_id                 TEXT,
    catalog_identifier         TEXT,
    catalog_id_updated_at      TIMESTAMPTZ,
    item_ids                   TEXT[] NOT NULL DEFAULT '{}',
    category_id                TEXT,
    category_id_updated_at     TIMESTAMPTZ,
    listing_price              DOUBLE PRECISION NOT NULL DEFAULT 0,
    listing_price_updated_at   TIMESTAMPTZ,
    price_history              JSONB NOT NULL DEFAULT '[]',
    average_price_30d          DOUBLE PRECISION NOT NULL DEFAULT 0,
    average_price_90d          DOUBLE PRECISION NOT NULL DEFAULT 0,
    average_price_180d         DOUBLE PRECISION NOT NULL DEFAULT 0,
    sale_commission            DOUBLE PRECISION NOT NULL DEFAULT 0,
    sale_commission_updated_at TIMESTAMPTZ,
    shipping_cost              DOUBLE PRECISION NOT NULL DEFAULT 0,
    shipping_cost_updated_at   TIMESTAMPTZ,
    total_visits_30d           BIGINT NOT NULL DEFAULT 0,
    total_visits_updated_at    TIMESTAMPTZ,
    source_price               DOUBLE PRECISION NOT NULL DEFAULT 0,
    source_price_updated_at    TIMESTAMPTZ,
    estimated_profit           DOUBLE PRECISION NOT NULL DEFAULT 0,
    is_match_correct           BOOLEAN NOT NULL DEFAULT TRUE,
    tracking                   BOOLEAN NOT NULL DEFAULT FALSE,
    created_at                 TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_product_mappings_catalog_id ON product_mappings (catalog_id);
CREATE INDEX IF NOT EXISTS idx_product_mappings_tracking ON product_mappings (tracking) WHERE tracking;
"#;

const UPDATE_ROW: &str = r#"
UPDATE product_mappings SET
    title = $2, image = $3, identifiers = $4, details_updated_at = $5,
    catalog_id = $6, catalog_identifier = $7, catalog_id_updated_at = $8,
    item_ids = $9, category_id = $10, category_id_updated_at = $11,
    listing_price = $12, listing_price_updated_at = $13, price_history = $14,
    average_price_30d = $15, average_price_90d = $16, average_price_180d = $17,
    sale_commission = $18, sale_commission_updated_at = $19,
    shipping_cost = $20, shipping_cost_updated_at = $21,
    total_visits_30d = $22, total_visits_updated_at = $23,
    source_price = $24, source_price_updated_at = $25,
    estimated_profit = $26, is_match_correct = $27, tracking = $28
WHERE record_key = $1
"#;

#[derive(Debug, FromRow)]
struct ProductMappingRow {
    record_key: String,
    title: Option<String>,
    image: Option<String>,
    identifiers: Vec<String>,
    details_updated_at: Option<DateTime<Utc>>,
    catalog_id: Option<String>,
    catalog_identifier: Option<String>,
    catalog_id_updated_at: Option<DateTime<Utc>>,
    item_ids: Vec<String>,
    category_id: Option<String>,
    category_id_updated_at: Option<DateTime<Utc>>,
    listing_price: f64,
    listing_price_updated_at: Option<DateTime<Utc>>,
    price_history: Json<Vec<PriceSample>>,
    average_price_30d: f64,
    average_price_90d: f64,
    average_price_180d: f64,
    sale_commission: f64,
    sale_commission_updated_at: Option<DateTime<Utc>>,
    shipping_cost: f64,
    shipping_cost_updated_at: Option<DateTime<Utc>>,
    total_visits_30d: i64,
    total_visits_updated_at: Option<DateTime<Utc>>,
    source_price: f64,
    source_price_updated_at: Option<DateTime<Utc>>,
    estimated_profit: f64,
    is_match_correct: bool,
    tracking: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductMappingRow> for ProductMapping {
    fn from(row: ProductMappingRow) -> Self {
        ProductMapping {
            key: RecordKey::new(row.record_key),
            title: row.title,
            image: row.image,
            identifiers: row.identifiers.into_iter().collect(),
            details_updated_at: row.details_updated_at,
            catalog_id: row.catalog_id,
            catalog_identifier: row.catalog_identifier,
            catalog_id_updated_at: row.catalog_id_updated_at,
            item_ids: row.item_ids.into_iter().collect(),
            category_id: row.category_id,
            category_id_updated_at: row.category_id_updated_at,
            listing_price: row.listing_price,
            listing_price_updated_at: row.listing_price_updated_at,
            price_history: row.price_history.0,
            average_price_30d: row.average_price_30d,
            average_price_90d: row.average_price_90d,
            average_price_180d: row.average_price_180d,
            sale_commission: row.sale_commission,
            sale_commission_updated_at: row.sale_commission_updated_at,
            shipping_cost: row.shipping_cost,
            shipping_cost_updated_at: row.shipping_cost_updated_at,
            total_visits_30d: u64::try_from(row.total_visits_30d).unwrap_or(0),
            total_visits_updated_at: row.total_visits_updated_at,
            source_price: row.source_price,
            source_price_updated_at: row.source_price_updated_at,
            estimated_profit: row.estimated_profit,
            is_match_correct: row.is_match_correct,
            tracking: row.tracking,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!(max_connections, "🗄️ Connected record store");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the table and indexes if absent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<bool> {
        let health: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(health == 1)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip(self, predicate))]
    async fn find_page(
        &self,
        predicate: &Predicate,
        after: Option<&RecordKey>,
        limit: usize,
    ) -> Result<Vec<ProductMapping>> {
        let limit = u32::try_from(limit)
            .map_err(|_| ReconcilerError::Paging(format!("page size {limit} out of range")))?;
        let pagination = match after {
            Some(key) => KeysetPagination::after(Field::Key.name(), key.as_str(), limit),
            None => KeysetPagination::first_page(Field::Key.name(), limit),
        };

        let built = QueryBuilder::new(TABLE)
            .filter(predicate)
            .keyset(pagination)
            .build();
        debug!(sql = %built.sql, binds = built.binds.len(), "Fetching page");

        let rows = built
            .fetch_all::<ProductMappingRow>(&self.pool)
            .await
            .map_err(|e| ReconcilerError::store("find_page", e))?;
        Ok(rows.into_iter().map(ProductMapping::from).collect())
    }

    async fn find_by_key(&self, key: &RecordKey) -> Result<Option<ProductMapping>> {
        let row = sqlx::query_as::<_, ProductMappingRow>(
            "SELECT * FROM product_mappings WHERE record_key = $1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReconcilerError::store("find_by_key", e))?;
        Ok(row.map(ProductMapping::from))
    }

    #[instrument(skip(self, mutations), fields(count = mutations.len()))]
    async fn bulk_apply(&self, mutations: &[MutationDescriptor]) -> Result<BulkWriteSummary> {
        let mut summary = BulkWriteSummary::default();
        if mutations.is_empty() {
            return Ok(summary);
        }

        let keys: Vec<&str> = mutations.iter().map(|m| m.key.as_str()).collect();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ReconcilerError::store("bulk_apply", e))?;

        let rows = sqlx::query_as::<_, ProductMappingRow>(
            "SELECT * FROM product_mappings WHERE record_key = ANY($1) \
             ORDER BY record_key FOR UPDATE",
        )
        .bind(&keys[..])
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| ReconcilerError::store("bulk_apply", e))?;

        let mut records: HashMap<RecordKey, ProductMapping> = rows
            .into_iter()
            .map(ProductMapping::from)
            .map(|record| (record.key.clone(), record))
            .collect();
        let mut changed: Vec<RecordKey> = Vec::new();

        for mutation in mutations {
            let Some(record) = records.get_mut(&mutation.key) else {
                summary.missing += 1;
                continue;
            };
            summary.matched += 1;
            let before = record.clone();
            record.apply(mutation);
            if *record != before && !changed.contains(&mutation.key) {
                changed.push(mutation.key.clone());
            }
        }

        for key in &changed {
            if let Some(record) = records.get(key) {
                write_row(&mut tx, record).await?;
            }
        }
        summary.modified = changed.len();

        tx.commit()
            .await
            .map_err(|e| ReconcilerError::store("bulk_apply", e))?;
        Ok(summary)
    }

    async fn insert_missing(
        &self,
        keys: &[RecordKey],
        created_at: DateTime<Utc>,
    ) -> Result<usize> {
        let keys: Vec<&str> = keys.iter().map(RecordKey::as_str).collect();
        let result = sqlx::query(
            "INSERT INTO product_mappings (record_key, created_at) \
             SELECT DISTINCT unnest($1::text[]), $2 \
             ON CONFLICT (record_key) DO NOTHING",
        )
        .bind(&keys[..])
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ReconcilerError::store("insert_missing", e))?;
        Ok(result.rows_affected() as usize)
    }

    async fn set_flag(&self, keys: &[RecordKey], flag: ControlFlag, value: bool) -> Result<usize> {
        let keys: Vec<&str> = keys.iter().map(RecordKey::as_str).collect();
        let column = flag.to_string();
        let sql = format!(
            "UPDATE product_mappings SET {column} = $1 \
             WHERE record_key = ANY($2) AND {column} IS DISTINCT FROM $1"
        );
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(&keys[..])
            .execute(&self.pool)
            .await
            .map_err(|e| ReconcilerError::store("set_flag", e))?;
        Ok(result.rows_affected() as usize)
    }
}

async fn write_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    record: &ProductMapping,
) -> Result<()> {
    sqlx::query(UPDATE_ROW)
        .bind(record.key.as_str())
        .bind(record.title.as_deref())
        .bind(record.image.as_deref())
        .bind(record.identifiers.as_slice())
        .bind(record.details_updated_at)
        .bind(record.catalog_id.as_deref())
        .bind(record.catalog_identifier.as_deref())
        .bind(record.catalog_id_updated_at)
        .bind(record.item_ids.as_slice())
        .bind(record.category_id.as_deref())
        .bind(record.category_id_updated_at)
        .bind(record.listing_price)
        .bind(record.listing_price_updated_at)
        .bind(Json(&record.price_history))
        .bind(record.average_price_30d)
        .bind(record.average_price_90d)
        .bind(record.average_price_180d)
        .bind(record.sale_commission)
        .bind(record.sale_commission_updated_at)
        .bind(record.shipping_cost)
        .bind(record.shipping_cost_updated_at)
        .bind(i64::try_from(record.total_visits_30d).unwrap_or(i64::MAX))
        .bind(record.total_visits_updated_at)
        .bind(record.source_price)
        .bind(record.source_price_updated_at)
        .bind(record.estimated_profit)
        .bind(record.is_match_correct)
        .bind(record.tracking)
        .execute(&mut **tx)
        .await
        .map_err(|e| ReconcilerError::store("bulk_apply", e))?;
    Ok(())
}
