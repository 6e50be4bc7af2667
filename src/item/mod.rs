//! Item Module
//!
//! The data model shared by the engine and the backing store.
//!
//! ## Layout
//! - Items are grouped by partition key (e.g. all children of one parent
//!   entity) and distinguished inside the group by sort key
//! - Sort keys are frequently composite: `type::id`
//! - Attributes are a map of field name → [`Value`]

mod value;

pub use value::Value;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute name reserved for the partition key
pub const PARTITION_KEY_FIELD: &str = "pk";

/// Attribute name reserved for the sort key
pub const SORT_KEY_FIELD: &str = "sk";

/// Separator used inside composite sort keys
pub const COMPOSITE_SEPARATOR: &str = "::";

/// Field name → value mapping
pub type Attributes = BTreeMap<String, Value>;

/// Composite primary key of an item
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    pub pk: String,
    pub sk: String,
}

impl Key {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Build a key whose sort key is the composite `kind::id`
    pub fn composite(pk: impl Into<String>, kind: &str, id: impl fmt::Display) -> Self {
        Self::new(pk, format!("{}{}{}", kind, COMPOSITE_SEPARATOR, id))
    }

    /// True when both components are non-empty
    pub fn is_complete(&self) -> bool {
        !self.pk.is_empty() && !self.sk.is_empty()
    }

    /// Split a composite sort key into its parts
    pub fn sort_key_parts(&self) -> Vec<&str> {
        self.sk.split(COMPOSITE_SEPARATOR).collect()
    }

    /// True when `field` names one of the key attributes
    pub fn is_key_field(field: &str) -> bool {
        field == PARTITION_KEY_FIELD || field == SORT_KEY_FIELD
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.pk, self.sk)
    }
}

/// A stored item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: Key,
    pub attributes: Attributes,
}

impl Item {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(key: Key, attributes: Attributes) -> Self {
        Self { key, attributes }
    }

    /// Get an attribute by name (key fields included)
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            PARTITION_KEY_FIELD => Some(Value::String(self.key.pk.clone())),
            SORT_KEY_FIELD => Some(Value::String(self.key.sk.clone())),
            _ => self.attributes.get(field).cloned(),
        }
    }

    /// Borrow a non-key attribute
    pub fn attribute(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Set a non-key attribute, returning the previous value
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.attributes.insert(field.into(), value)
    }

    /// Stored optimistic-concurrency version (0 when never versioned)
    pub fn version(&self, field: &str) -> u64 {
        self.attributes
            .get(field)
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_sort_key() {
        let key = Key::composite("park::1", "site", 42);
        assert_eq!(key.sk, "site::42");
        assert_eq!(key.sort_key_parts(), vec!["site", "42"]);
        assert!(key.is_complete());
        assert!(!Key::new("park::1", "").is_complete());
    }

    #[test]
    fn test_item_get_includes_key_fields() {
        let mut item = Item::new(Key::new("park::1", "details"));
        item.set("name", Value::from("Lakeside"));

        assert_eq!(item.get(PARTITION_KEY_FIELD), Some(Value::from("park::1")));
        assert_eq!(item.get(SORT_KEY_FIELD), Some(Value::from("details")));
        assert_eq!(item.get("name"), Some(Value::from("Lakeside")));
        assert_eq!(item.get("missing"), None);
        assert_eq!(item.version("version"), 0);
    }
}
