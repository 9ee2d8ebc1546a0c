use super::conditions::{BindValue, Parameters};

/// Keyset pagination over a unique, totally ordered text column.
///
/// Comparison and ordering use the `"C"` collation (byte order), whatever the column's own
/// collation is. Pages are `ORDER BY column ASC LIMIT n`, each starting strictly after the last key of
/// the previous page. Unlike `OFFSET` pagination, rows updated between pages never shift
/// the window.
#[derive(Debug, Clone, PartialEq)]
pub struct KeysetPagination {
    pub column: &'static str,
    /// Exclusive lower bound; `None` for the first page.
    pub after: Option<String>,
    pub limit: u32,
}

impl KeysetPagination {
    pub fn first_page(column: &'static str, limit: u32) -> Self {
        Self {
            column,
            after: None,
            limit,
        }
    }

    pub fn after(column: &'static str, key: impl Into<String>, limit: u32) -> Self {
        Self {
            column,
            after: Some(key.into()),
            limit,
        }
    }

    /// The cursor condition, if any, with its placeholder registered in `params`.
    pub fn cursor_sql(&self, params: &mut Parameters) -> Option<String> {
        self.after.as_ref().map(|key| {
            let placeholder = params.push(BindValue::Text(key.clone()));
            format!("{} COLLATE \"C\" > {}", self.column, placeholder)
        })
    }

    pub fn order_sql(&self) -> String {
        format!(" ORDER BY {} COLLATE \"C\" ASC", self.column)
    }

    pub fn limit_sql(&self) -> String {
        format!(" LIMIT {}", self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_cursor() {
        let pagination = KeysetPagination::first_page("record_key", 200);
        let mut params = Parameters::new();
        assert_eq!(pagination.cursor_sql(&mut params), None);
        assert_eq!(pagination.limit_sql(), " LIMIT 200");
    }

    #[test]
    fn later_pages_start_strictly_after_cursor() {
        let pagination = KeysetPagination::after("record_key", "B00042", 50);
        let mut params = Parameters::new();
        params.push(BindValue::Bool(true));

        assert_eq!(
            pagination.cursor_sql(&mut params).as_deref(),
            Some(r#"record_key COLLATE "C" > $2"#)
        );
        assert_eq!(pagination.order_sql(), r#" ORDER BY record_key COLLATE "C" ASC"#);
    }
}
