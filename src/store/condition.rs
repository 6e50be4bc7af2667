//! Write conditions
//!
//! Predicates evaluated by the store against the current item at commit
//! time. A write whose condition evaluates false is not applied.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::{Item, Value, PARTITION_KEY_FIELD};

/// A condition attached to a compiled write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Item must already exist
    ItemExists,

    /// Item must not exist yet
    ItemNotExists,

    /// Attribute must be present on the item
    AttributeExists(String),

    /// Attribute must be absent (true when the item itself is absent)
    AttributeNotExists(String),

    /// Attribute must equal the value
    Equals { field: String, value: Value },

    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    /// Stored version must equal `expected`
    ///
    /// A never-versioned item counts as version 0.
    pub fn version_equals(field: &str, expected: u64) -> Condition {
        let equals = Condition::Equals {
            field: field.to_string(),
            value: Value::from(expected),
        };
        if expected == 0 {
            Condition::Or(vec![Condition::AttributeNotExists(field.to_string()), equals])
        } else {
            equals
        }
    }

    /// Combine with another condition, flattening nested ANDs
    pub fn and(self, other: Condition) -> Condition {
        match (self, other) {
            (Condition::And(mut left), Condition::And(right)) => {
                left.extend(right);
                Condition::And(left)
            }
            (Condition::And(mut left), right) => {
                left.push(right);
                Condition::And(left)
            }
            (left, Condition::And(mut right)) => {
                right.insert(0, left);
                Condition::And(right)
            }
            (left, right) => Condition::And(vec![left, right]),
        }
    }

    /// Combine two optional conditions
    pub fn merge(left: Option<Condition>, right: Option<Condition>) -> Option<Condition> {
        match (left, right) {
            (Some(l), Some(r)) => Some(l.and(r)),
            (l, r) => l.or(r),
        }
    }

    /// Evaluate against the current state of the item
    pub fn evaluate(&self, current: Option<&Item>) -> bool {
        match self {
            Condition::ItemExists => current.is_some(),
            Condition::ItemNotExists => current.is_none(),
            Condition::AttributeExists(field) => {
                current.map_or(false, |item| item.get(field).is_some())
            }
            Condition::AttributeNotExists(field) => {
                current.map_or(true, |item| item.get(field).is_none())
            }
            Condition::Equals { field, value } => current
                .and_then(|item| item.get(field))
                .map_or(false, |stored| stored.loosely_equals(value)),
            Condition::And(conditions) => conditions.iter().all(|c| c.evaluate(current)),
            Condition::Or(conditions) => conditions.iter().any(|c| c.evaluate(current)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ItemExists => write!(f, "attribute_exists({})", PARTITION_KEY_FIELD),
            Condition::ItemNotExists => {
                write!(f, "attribute_not_exists({})", PARTITION_KEY_FIELD)
            }
            Condition::AttributeExists(field) => write!(f, "attribute_exists({})", field),
            Condition::AttributeNotExists(field) => write!(f, "attribute_not_exists({})", field),
            Condition::Equals { field, value } => write!(f, "{} = {}", field, value),
            Condition::And(conditions) => write_joined(f, conditions, " AND "),
            Condition::Or(conditions) => write_joined(f, conditions, " OR "),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, conditions: &[Condition], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", condition)?;
    }
    write!(f, ")")
}
