//! Predicate query language evaluated by the shared public store
//!
//! The directory only needs a small filter algebra: equality, field
//! presence, match-all, and AND/OR composition, plus a single-field sort.
//! Predicates are serializable because persistent subscriptions carry them.

use serde::{Deserialize, Serialize};

use crate::record::{FieldValue, WireRecord};

/// Filter expression evaluated store-side against wire records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every record of the queried kind
    All,
    /// Field equals the given value (absent or mis-typed fields do not match)
    Eq(String, FieldValue),
    /// Field is present, whatever its value
    IsPresent(String),
    /// All sub-predicates match
    And(Vec<Predicate>),
    /// At least one sub-predicate matches
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Convenience constructor for text equality, the common case
    pub fn text_eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Eq(field.into(), FieldValue::Text(value.into()))
    }

    /// Evaluate this predicate against a record
    pub fn matches(&self, record: &WireRecord) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Eq(field, value) => record.get(field) == Some(value),
            Predicate::IsPresent(field) => record.is_present(field),
            Predicate::And(preds) => preds.iter().all(|p| p.matches(record)),
            Predicate::Or(preds) => preds.iter().any(|p| p.matches(record)),
        }
    }
}

/// Sort direction for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Smallest value first
    Ascending,
    /// Largest value first
    Descending,
}

/// Single-field sort applied store-side to query results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    /// Field to order by
    pub field: String,
    /// Order direction
    pub direction: Direction,
}

impl Sort {
    /// Sort by `field`, smallest first
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    /// Sort by `field`, largest first
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    /// Order a batch of records in place.
    ///
    /// Records missing the sort field (or holding an unorderable type)
    /// compare below every present value, so they sort first under
    /// `Ascending` and last under `Descending`. The sort is stable, so
    /// equal keys keep their store iteration order.
    pub fn apply(&self, records: &mut [WireRecord]) {
        records.sort_by(|a, b| {
            let ord = compare_field(a.get(&self.field), b.get(&self.field));
            match self.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }
}

/// Total order over optional field values for sorting
fn compare_field(a: Option<&FieldValue>, b: Option<&FieldValue>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),
            // Mixed or unorderable types keep their relative order
            _ => Ordering::Equal,
        },
    }
}
