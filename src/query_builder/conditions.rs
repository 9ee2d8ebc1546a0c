use crate::predicate::{CompareOp, Field, FieldKind, Predicate, Value};
use chrono::{DateTime, Utc};

/// Value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    TextArray(Vec<String>),
}

/// Ordered bind values of a statement under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: Vec<BindValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` and return its placeholder.
    pub fn push(&mut self, value: BindValue) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<BindValue> {
        self.values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    fn sql(&self) -> &'static str {
        match self {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        }
    }
}

/// SQL condition with its placeholders already assigned.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    True,
    False,
    /// `column IS [NOT] DISTINCT FROM $n`, null-safe equality.
    Equality {
        column: &'static str,
        negated: bool,
        placeholder: String,
    },
    /// Ordering comparison; false when the column is NULL.
    Ordering {
        column: &'static str,
        operator: &'static str,
        placeholder: String,
    },
    IsNull {
        column: &'static str,
    },
    IsNotNull {
        column: &'static str,
    },
    ArrayEmpty {
        column: &'static str,
    },
    ArrayNotEmpty {
        column: &'static str,
    },
    /// Some element of the JSONB price history matches.
    HistoryExists {
        operator: &'static str,
        price: String,
        since: String,
    },
    Group {
        operator: LogicalOperator,
        conditions: Vec<Condition>,
    },
    Not(Box<Condition>),
}

impl Condition {
    /// Translate `predicate`, registering literals in `params`.
    pub fn from_predicate(predicate: &Predicate, params: &mut Parameters) -> Self {
        match predicate {
            Predicate::True => Condition::True,
            Predicate::All(clauses) => Self::group(LogicalOperator::And, clauses, params),
            Predicate::Any(clauses) => Self::group(LogicalOperator::Or, clauses, params),
            Predicate::Not(inner) => {
                Condition::Not(Box::new(Self::from_predicate(inner, params)))
            }
            Predicate::Compare { field, op, value } => Self::compare(*field, *op, value, params),
            Predicate::IsSet(field) => match field.kind() {
                FieldKind::Set => Condition::ArrayNotEmpty {
                    column: field.name(),
                },
                _ => Condition::IsNotNull {
                    column: field.name(),
                },
            },
            Predicate::IsUnset(field) => match field.kind() {
                FieldKind::Set => Condition::ArrayEmpty {
                    column: field.name(),
                },
                _ => Condition::IsNull {
                    column: field.name(),
                },
            },
            Predicate::HistoryAny { op, price, since } => Condition::HistoryExists {
                operator: op.sql(),
                price: params.push(BindValue::Number(*price)),
                since: params.push(BindValue::Timestamp(*since)),
            },
        }
    }

    fn group(operator: LogicalOperator, clauses: &[Predicate], params: &mut Parameters) -> Self {
        Condition::Group {
            operator,
            conditions: clauses
                .iter()
                .map(|clause| Self::from_predicate(clause, params))
                .collect(),
        }
    }

    fn compare(field: Field, op: CompareOp, value: &Value, params: &mut Parameters) -> Self {
        let column = field.name();
        let bind = match bind_value(value) {
            Some(bind) => bind,
            // Null literal: equality degenerates to a null test, ordering never holds.
            None => {
                return match op {
                    CompareOp::Eq => Condition::IsNull { column },
                    CompareOp::Ne => Condition::IsNotNull { column },
                    _ => Condition::False,
                }
            }
        };

        match op {
            CompareOp::Eq | CompareOp::Ne => Condition::Equality {
                column,
                negated: op == CompareOp::Ne,
                placeholder: params.push(bind),
            },
            _ => Condition::Ordering {
                column,
                operator: op.sql(),
                placeholder: params.push(bind),
            },
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Condition::True => "TRUE".to_string(),
            Condition::False => "FALSE".to_string(),
            Condition::Equality {
                column,
                negated,
                placeholder,
            } => {
                let operator = if *negated {
                    "IS DISTINCT FROM"
                } else {
                    "IS NOT DISTINCT FROM"
                };
                format!("{column} {operator} {placeholder}")
            }
            Condition::Ordering {
                column,
                operator,
                placeholder,
            } => format!("({column} IS NOT NULL AND {column} {operator} {placeholder})"),
            Condition::IsNull { column } => format!("{column} IS NULL"),
            Condition::IsNotNull { column } => format!("{column} IS NOT NULL"),
            Condition::ArrayEmpty { column } => format!("cardinality({column}) = 0"),
            Condition::ArrayNotEmpty { column } => format!("cardinality({column}) > 0"),
            Condition::HistoryExists {
                operator,
                price,
                since,
            } => format!(
                "EXISTS (SELECT 1 FROM jsonb_array_elements(price_history) AS sample \
                 WHERE (sample->>'recorded_at')::timestamptz >= {since} \
                 AND (sample->>'price')::double precision {operator} {price})"
            ),
            Condition::Group {
                operator,
                conditions,
            } => {
                if conditions.is_empty() {
                    return match operator {
                        LogicalOperator::And => "TRUE".to_string(),
                        LogicalOperator::Or => "FALSE".to_string(),
                    };
                }
                let parts: Vec<String> = conditions.iter().map(Condition::to_sql).collect();
                format!("({})", parts.join(operator.sql()))
            }
            Condition::Not(inner) => format!("NOT ({})", inner.to_sql()),
        }
    }
}

fn bind_value(value: &Value) -> Option<BindValue> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(BindValue::Bool(*flag)),
        Value::Number(number) => Some(BindValue::Number(*number)),
        Value::Timestamp(at) => Some(BindValue::Timestamp(*at)),
        Value::Text(text) => Some(BindValue::Text(text.clone())),
        Value::List(items) => Some(BindValue::TextArray(items.clone())),
    }
}

/// Conjunction of conditions, the WHERE clause of a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub conditions: Vec<Condition>,
}

impl WhereClause {
    pub fn push(&mut self, condition: Condition) {
        if condition != Condition::True {
            self.conditions.push(condition);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn to_sql(&self) -> String {
        self.conditions
            .iter()
            .map(Condition::to_sql)
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn staleness_renders_null_or_older() {
        let mut params = Parameters::new();
        let condition = Condition::from_predicate(
            &Predicate::stale(Field::ListingPriceUpdatedAt, cutoff()),
            &mut params,
        );

        assert_eq!(
            condition.to_sql(),
            "(listing_price_updated_at IS NULL OR (listing_price_updated_at IS NOT NULL \
             AND listing_price_updated_at <= $1))"
        );
        assert_eq!(params.into_values(), vec![BindValue::Timestamp(cutoff())]);
    }

    #[test]
    fn equality_is_null_safe() {
        let mut params = Parameters::new();
        let condition =
            Condition::from_predicate(&Predicate::ne(Field::IsMatchCorrect, false), &mut params);
        assert_eq!(condition.to_sql(), "is_match_correct IS DISTINCT FROM $1");
    }

    #[test]
    fn set_fields_test_cardinality() {
        let mut params = Parameters::new();
        let condition = Condition::from_predicate(&Predicate::is_set(Field::ItemIds), &mut params);
        assert_eq!(condition.to_sql(), "cardinality(item_ids) > 0");
        assert!(params.is_empty());
    }

    #[test]
    fn history_any_becomes_exists_subquery() {
        let mut params = Parameters::new();
        let condition = Condition::from_predicate(
            &Predicate::HistoryAny {
                op: CompareOp::Gt,
                price: 0.0,
                since: cutoff(),
            },
            &mut params,
        );

        let sql = condition.to_sql();
        assert!(sql.starts_with("EXISTS (SELECT 1 FROM jsonb_array_elements(price_history)"));
        assert!(sql.contains("::timestamptz >= $2"));
        assert!(sql.contains("::double precision > $1"));
    }

    #[test]
    fn null_literals_never_bind() {
        let mut params = Parameters::new();
        let eq_null = Condition::from_predicate(
            &Predicate::eq(Field::CatalogId, Value::Null),
            &mut params,
        );
        assert_eq!(eq_null.to_sql(), "catalog_id IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn empty_any_group_is_false() {
        let mut params = Parameters::new();
        let condition = Condition::from_predicate(&Predicate::Any(vec![]), &mut params);
        assert_eq!(condition.to_sql(), "FALSE");
    }
}
