use super::conditions::{BindValue, Condition, Parameters, WhereClause};
use super::pagination::KeysetPagination;
use crate::predicate::Predicate;

/// A rendered statement and its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// SELECT builder over a single table, filtered by a [`Predicate`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_table: String,
    select_fields: Vec<String>,
    where_clause: WhereClause,
    order_by: Vec<String>,
    pagination: Option<KeysetPagination>,
    limit: Option<u32>,
    params: Parameters,
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            base_table: table.to_string(),
            select_fields: vec!["*".to_string()],
            where_clause: WhereClause::default(),
            order_by: Vec::new(),
            pagination: None,
            limit: None,
            params: Parameters::new(),
        }
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// AND a predicate into the WHERE clause.
    pub fn filter(mut self, predicate: &Predicate) -> Self {
        let condition = Condition::from_predicate(predicate, &mut self.params);
        self.where_clause.push(condition);
        self
    }

    pub fn order_by(mut self, field: &str, direction: &str) -> Self {
        self.order_by.push(format!("{field} {direction}"));
        self
    }

    pub fn order_desc(self, field: &str) -> Self {
        self.order_by(field, "DESC")
    }

    /// Keyset pagination. Replaces any ORDER BY and LIMIT set so far.
    pub fn keyset(mut self, pagination: KeysetPagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(mut self) -> BuiltQuery {
        let cursor = self
            .pagination
            .as_ref()
            .and_then(|pagination| pagination.cursor_sql(&mut self.params));

        let mut sql = format!(
            "SELECT {} FROM {}",
            self.select_fields.join(", "),
            self.base_table
        );

        let mut where_parts = Vec::new();
        if !self.where_clause.is_empty() {
            where_parts.push(self.where_clause.to_sql());
        }
        where_parts.extend(cursor);
        if !where_parts.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_parts.join(" AND "));
        }

        match &self.pagination {
            Some(pagination) => {
                sql.push_str(&pagination.order_sql());
                sql.push_str(&pagination.limit_sql());
            }
            None => {
                if !self.order_by.is_empty() {
                    sql.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
                }
                if let Some(limit) = self.limit {
                    sql.push_str(&format!(" LIMIT {limit}"));
                }
            }
        }

        BuiltQuery {
            sql,
            binds: self.params.into_values(),
        }
    }
}

#[cfg(feature = "postgres")]
mod execute {
    use super::{BindValue, BuiltQuery};
    use sqlx::postgres::{PgArguments, PgRow};
    use sqlx::{FromRow, PgPool, Postgres};

    impl BuiltQuery {
        /// Prepare the statement with every bind value attached.
        pub fn query_as<T>(&self) -> sqlx::query::QueryAs<'_, Postgres, T, PgArguments>
        where
            T: for<'r> FromRow<'r, PgRow>,
        {
            let mut query = sqlx::query_as::<_, T>(&self.sql);
            for value in &self.binds {
                query = match value {
                    BindValue::Text(text) => query.bind(text.as_str()),
                    BindValue::Number(number) => query.bind(*number),
                    BindValue::Timestamp(at) => query.bind(*at),
                    BindValue::Bool(flag) => query.bind(*flag),
                    BindValue::TextArray(items) => query.bind(items.as_slice()),
                };
            }
            query
        }

        pub async fn fetch_all<T>(&self, pool: &PgPool) -> Result<Vec<T>, sqlx::Error>
        where
            T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        {
            self.query_as::<T>().fetch_all(pool).await
        }
    }
}
