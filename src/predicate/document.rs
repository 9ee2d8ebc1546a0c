use super::{CompareOp, Field, Predicate, PredicateError, Value};
use std::fmt;

/// Condition on a single field inside a [`FilterDocument`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    Compare(CompareOp, Value),
    Set,
    Unset,
}

impl FieldCondition {
    pub fn eq(value: impl Into<Value>) -> Self {
        FieldCondition::Compare(CompareOp::Eq, value.into())
    }

    pub fn ne(value: impl Into<Value>) -> Self {
        FieldCondition::Compare(CompareOp::Ne, value.into())
    }

    pub fn gt(value: impl Into<Value>) -> Self {
        FieldCondition::Compare(CompareOp::Gt, value.into())
    }

    pub fn gte(value: impl Into<Value>) -> Self {
        FieldCondition::Compare(CompareOp::Gte, value.into())
    }

    fn into_predicate(self, field: Field) -> Predicate {
        match self {
            FieldCondition::Compare(op, value) => Predicate::Compare { field, op, value },
            FieldCondition::Set => Predicate::IsSet(field),
            FieldCondition::Unset => Predicate::IsUnset(field),
        }
    }
}

/// Top-level key of a filter document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Field(Field),
    Any,
    All,
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Field(field) => write!(f, "{field}"),
            FilterKey::Any => write!(f, "any"),
            FilterKey::All => write!(f, "all"),
        }
    }
}

/// Keyed conjunction of clauses, the top level of every pass filter.
///
/// Each key may appear once. Two disjunctions on the same document must be nested
/// under a single [`FilterDocument::all_of`] group:
///
/// ```rust
/// use reconciler_core::predicate::{Field, FieldCondition, FilterDocument, Predicate};
///
/// let document = FilterDocument::new()
///     .field(Field::CatalogId, FieldCondition::Set)
///     .unwrap()
///     .any_of(vec![Predicate::eq(Field::Tracking, false)])
///     .unwrap();
///
/// // A second `any` would replace the first in a map-shaped filter; here it is rejected.
/// assert!(document
///     .any_of(vec![Predicate::is_unset(Field::SourcePriceUpdatedAt)])
///     .is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDocument {
    clauses: Vec<(FilterKey, Predicate)>,
}

impl FilterDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(self, field: Field, condition: FieldCondition) -> Result<Self, PredicateError> {
        self.insert(FilterKey::Field(field), condition.into_predicate(field))
    }

    pub fn any_of(self, clauses: Vec<Predicate>) -> Result<Self, PredicateError> {
        if clauses.is_empty() {
            return Err(PredicateError::EmptyGroup("any"));
        }
        self.insert(FilterKey::Any, Predicate::Any(clauses))
    }

    pub fn all_of(self, clauses: Vec<Predicate>) -> Result<Self, PredicateError> {
        if clauses.is_empty() {
            return Err(PredicateError::EmptyGroup("all"));
        }
        self.insert(FilterKey::All, Predicate::All(clauses))
    }

    pub fn keys(&self) -> impl Iterator<Item = FilterKey> + '_ {
        self.clauses.iter().map(|(key, _)| *key)
    }

    pub fn into_predicate(self) -> Predicate {
        let mut clauses: Vec<Predicate> = self
            .clauses
            .into_iter()
            .map(|(_, predicate)| predicate)
            .collect();
        match clauses.len() {
            0 => Predicate::True,
            1 => clauses.remove(0),
            _ => Predicate::All(clauses),
        }
    }

    fn insert(mut self, key: FilterKey, predicate: Predicate) -> Result<Self, PredicateError> {
        if self.clauses.iter().any(|(existing, _)| *existing == key) {
            return Err(PredicateError::DuplicateKey(key.to_string()));
        }
        self.clauses.push((key, predicate));
        Ok(self)
    }
}
