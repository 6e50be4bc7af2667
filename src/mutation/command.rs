//! Logical commands
//!
//! Caller intent before validation. Never persisted.

use std::collections::BTreeMap;

use crate::item::{Key, Value};

use super::Action;

/// One field change requested by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    /// Assign a value (`Set(Null)` means remove)
    Set(Value),

    /// Remove the field from the stored item
    Remove,

    /// Append to a list or increment a number
    Add(Value),
}

impl FieldChange {
    /// The action this change implies
    pub fn action(&self) -> Action {
        match self {
            FieldChange::Set(Value::Null) | FieldChange::Remove => Action::Remove,
            FieldChange::Set(_) => Action::Set,
            FieldChange::Add(_) => Action::Add,
        }
    }

    /// The value carried, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldChange::Set(Value::Null) | FieldChange::Remove => None,
            FieldChange::Set(value) | FieldChange::Add(value) => Some(value),
        }
    }
}

/// A caller's intent to create, update, or delete one item
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalCommand {
    pub key: Key,

    pub data: BTreeMap<String, FieldChange>,

    /// Version the caller observed when it read the item
    pub expected_version: Option<u64>,
}

impl LogicalCommand {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            data: BTreeMap::new(),
            expected_version: None,
        }
    }

    /// Build from a plain field → value map (nulls become removals)
    pub fn from_values(key: Key, values: impl IntoIterator<Item = (String, Value)>) -> Self {
        let data = values
            .into_iter()
            .map(|(field, value)| (field, FieldChange::Set(value)))
            .collect();
        Self {
            key,
            data,
            expected_version: None,
        }
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), FieldChange::Set(value.into()));
        self
    }

    pub fn remove(mut self, field: impl Into<String>) -> Self {
        self.data.insert(field.into(), FieldChange::Remove);
        self
    }

    pub fn append(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), FieldChange::Add(value.into()));
        self
    }

    pub fn expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}
