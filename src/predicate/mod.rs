//! # Predicate Language
//!
//! Typed selection predicates over [`ProductMapping`] records. A pass is driven by one
//! [`Predicate`]; the same predicate is evaluated in memory by
//! [`crate::store::InMemoryRecordStore`] and rendered to SQL by
//! [`crate::query_builder`], with identical semantics:
//!
//! - Ordering comparisons against an unset value are false. Staleness checks therefore
//!   spell out "unset OR older than cutoff" (see [`Predicate::stale`]).
//! - `IsUnset` holds for `NULL` scalars and empty identifier sets.
//! - `Ne` holds when the stored value differs, including when it is unset.
//!
//! Top-level filters are assembled with [`FilterDocument`], which rejects duplicate keys
//! instead of letting a later clause silently replace an earlier one.

pub mod document;
pub mod field;

pub use document::{FieldCondition, FilterDocument, FilterKey};
pub use field::{Field, FieldKind};

use crate::models::ProductMapping;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("duplicate top-level filter key '{0}'")]
    DuplicateKey(String),
    #[error("'{0}' group must contain at least one clause")]
    EmptyGroup(&'static str),
}

/// Literal operand of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
    List(Vec<String>),
}

impl Value {
    pub fn is_unset(&self) -> bool {
        match self {
            Value::Null => true,
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    fn partial_cmp_same_kind(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<Option<&str>> for Value {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Value::Null, Value::from)
    }
}

impl From<Option<DateTime<Utc>>> for Value {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Value::Null, Value::Timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    /// Evaluate `lhs <op> rhs`.
    pub fn evaluate(&self, lhs: &Value, rhs: &Value) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            _ => match lhs.partial_cmp_same_kind(rhs) {
                Some(ordering) => match self {
                    Self::Gt => ordering == Ordering::Greater,
                    Self::Gte => ordering != Ordering::Less,
                    Self::Lt => ordering == Ordering::Less,
                    Self::Lte => ordering != Ordering::Greater,
                    Self::Eq | Self::Ne => unreachable!("handled above"),
                },
                None => false,
            },
        }
    }
}

/// Selection predicate over records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    True,
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        field: Field,
        op: CompareOp,
        value: Value,
    },
    IsSet(Field),
    IsUnset(Field),
    /// Some price history sample recorded at or after `since` satisfies `price <op> value`.
    HistoryAny {
        op: CompareOp,
        price: f64,
        since: DateTime<Utc>,
    },
}

impl Predicate {
    pub fn compare(field: Field, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn lte(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn is_set(field: Field) -> Self {
        Predicate::IsSet(field)
    }

    pub fn is_unset(field: Field) -> Self {
        Predicate::IsUnset(field)
    }

    /// `timestamp` never written, or written at or before `cutoff`.
    pub fn stale(timestamp: Field, cutoff: DateTime<Utc>) -> Self {
        Predicate::Any(vec![
            Predicate::IsUnset(timestamp),
            Predicate::lte(timestamp, cutoff),
        ])
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::True => other,
            Predicate::All(mut clauses) => {
                clauses.push(other);
                Predicate::All(clauses)
            }
            this => Predicate::All(vec![this, other]),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn matches(&self, record: &ProductMapping) -> bool {
        match self {
            Predicate::True => true,
            Predicate::All(clauses) => clauses.iter().all(|clause| clause.matches(record)),
            Predicate::Any(clauses) => clauses.iter().any(|clause| clause.matches(record)),
            Predicate::Not(inner) => !inner.matches(record),
            Predicate::Compare { field, op, value } => {
                op.evaluate(&record.field_value(*field), value)
            }
            Predicate::IsSet(field) => !record.field_value(*field).is_unset(),
            Predicate::IsUnset(field) => record.field_value(*field).is_unset(),
            Predicate::HistoryAny { op, price, since } => {
                let rhs = Value::Number(*price);
                record.price_history.iter().any(|sample| {
                    sample.recorded_at >= *since
                        && op.evaluate(&Value::Number(sample.price), &rhs)
                })
            }
        }
    }
}
