//! Compiled transaction items
//!
//! The store-ready form of one logical command. Produced by the command
//! compiler, never mutated after compilation, applied by the store.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ParkError, Result};
use crate::item::{Attributes, Item, Key, Value};

use super::Condition;

/// Kind of write a compiled item performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Put,
    Update,
    Delete,
}

/// The write itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Replace the whole item
    Put(Attributes),

    /// Partial update; fields not named are left untouched
    Update(UpdateExpression),

    Delete,
}

/// SET / REMOVE / ADD clauses of a partial update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpression {
    pub set: Attributes,
    pub remove: BTreeSet<String>,
    pub add: Attributes,
}

/// A store-ready write with its pre-condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledItem {
    /// Table the write targets
    pub table: String,

    pub key: Key,

    pub operation: Operation,

    pub condition: Option<Condition>,

    /// Version the item will carry once committed (auto-versioned commands only)
    pub version: Option<u64>,
}

impl CompiledItem {
    pub fn action(&self) -> ActionKind {
        match self.operation {
            Operation::Put(_) => ActionKind::Put,
            Operation::Update(_) => ActionKind::Update,
            Operation::Delete => ActionKind::Delete,
        }
    }
}

impl fmt::Display for CompiledItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} {}", self.action(), self.table, self.key)?;
        if let Operation::Update(expr) = &self.operation {
            write!(f, " {}", expr)?;
        }
        if let Some(condition) = &self.condition {
            write!(f, " IF {}", condition)?;
        }
        Ok(())
    }
}

impl Operation {
    /// Compute the item state after this write
    ///
    /// Returns `None` when the item is deleted. Updates against an absent
    /// item start from an empty one; callers guard with `ItemExists`.
    pub fn apply(&self, key: &Key, current: Option<Item>) -> Result<Option<Item>> {
        match self {
            Operation::Put(attributes) => Ok(Some(Item::with_attributes(
                key.clone(),
                attributes.clone(),
            ))),
            Operation::Update(expr) => {
                let mut item = current.unwrap_or_else(|| Item::new(key.clone()));
                expr.apply(&mut item)?;
                Ok(Some(item))
            }
            Operation::Delete => Ok(None),
        }
    }
}

impl UpdateExpression {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty() && self.add.is_empty()
    }

    /// Apply SET, then REMOVE, then ADD
    pub fn apply(&self, item: &mut Item) -> Result<()> {
        for (field, value) in &self.set {
            item.attributes.insert(field.clone(), value.clone());
        }
        for field in &self.remove {
            item.attributes.remove(field);
        }
        for (field, delta) in &self.add {
            let next: Value = match item.attributes.remove(field) {
                None if delta.is_number() || delta.as_list().is_some() => delta.clone(),
                // First element of a not-yet-existing list
                None => Value::List(vec![delta.clone()]),
                Some(existing) => add_values(field, existing, delta)?,
            };
            item.attributes.insert(field.clone(), next);
        }
        Ok(())
    }
}

/// ADD semantics: numbers are summed, lists are appended to
fn add_values(field: &str, existing: Value, delta: &Value) -> Result<Value> {
    match (existing, delta) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| ParkError::Store(format!("ADD overflow on field '{}'", field))),
        (a, b) if a.is_number() && b.is_number() => {
            Ok(Value::Float(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0)))
        }
        (Value::List(mut items), Value::List(more)) => {
            items.extend(more.iter().cloned());
            Ok(Value::List(items))
        }
        (Value::List(mut items), single) => {
            items.push(single.clone());
            Ok(Value::List(items))
        }
        (existing, delta) => Err(ParkError::Store(format!(
            "cannot ADD {} to {} on field '{}'",
            delta.type_name(),
            existing.type_name(),
            field
        ))),
    }
}

impl fmt::Display for UpdateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses = Vec::new();
        if !self.set.is_empty() {
            let parts: Vec<String> = self
                .set
                .iter()
                .map(|(k, v)| format!("#{} = {}", k, v))
                .collect();
            clauses.push(format!("SET {}", parts.join(", ")));
        }
        if !self.remove.is_empty() {
            let parts: Vec<String> = self.remove.iter().map(|k| format!("#{}", k)).collect();
            clauses.push(format!("REMOVE {}", parts.join(", ")));
        }
        if !self.add.is_empty() {
            let parts: Vec<String> = self
                .add
                .iter()
                .map(|(k, v)| format!("#{} {}", k, v))
                .collect();
            clauses.push(format!("ADD {}", parts.join(", ")));
        }
        write!(f, "{}", clauses.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_leaves_untouched_fields() {
        let mut item = Item::new(Key::new("p", "s"));
        item.set("a", Value::from("keep"));
        item.set("b", Value::from("old"));
        item.set("c", Value::from("gone"));

        let mut expr = UpdateExpression::default();
        expr.set.insert("b".into(), Value::from("new"));
        expr.remove.insert("c".into());
        expr.apply(&mut item).unwrap();

        assert_eq!(item.attribute("a"), Some(&Value::from("keep")));
        assert_eq!(item.attribute("b"), Some(&Value::from("new")));
        assert_eq!(item.attribute("c"), None);
    }

    #[test]
    fn test_add_appends_and_increments() {
        let mut item = Item::new(Key::new("p", "s"));
        item.set("tags", Value::List(vec![Value::from("a")]));
        item.set("count", Value::Int(2));

        let mut expr = UpdateExpression::default();
        expr.add.insert("tags".into(), Value::List(vec![Value::from("b")]));
        expr.add.insert("count".into(), Value::Int(3));
        expr.add.insert("fresh".into(), Value::Int(1));
        expr.apply(&mut item).unwrap();

        assert_eq!(
            item.attribute("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(item.attribute("count"), Some(&Value::Int(5)));
        assert_eq!(item.attribute("fresh"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_add_type_mismatch() {
        let mut item = Item::new(Key::new("p", "s"));
        item.set("name", Value::from("x"));

        let mut expr = UpdateExpression::default();
        expr.add.insert("name".into(), Value::Int(1));
        assert!(expr.apply(&mut item).is_err());
    }

    #[test]
    fn test_expression_display() {
        let mut expr = UpdateExpression::default();
        expr.set.insert("displayName".into(), Value::from("Alpine Pass"));
        expr.remove.insert("legacy".into());
        assert_eq!(
            expr.to_string(),
            "SET #displayName = \"Alpine Pass\" REMOVE #legacy"
        );
    }
}
