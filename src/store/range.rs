//! Key-condition range queries
//!
//! A query selects one partition by equality and optionally narrows the
//! sort key. Results are returned one page at a time.

use crate::item::{Item, Key};

/// Condition on the sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    Equals(String),
    BeginsWith(String),
    /// Inclusive on both ends
    Between(String, String),
    LessThan(String),
    LessOrEqual(String),
    GreaterThan(String),
    GreaterOrEqual(String),
}

impl SortKeyCondition {
    pub fn matches(&self, sk: &str) -> bool {
        match self {
            SortKeyCondition::Equals(v) => sk == v,
            SortKeyCondition::BeginsWith(prefix) => sk.starts_with(prefix.as_str()),
            SortKeyCondition::Between(low, high) => sk >= low.as_str() && sk <= high.as_str(),
            SortKeyCondition::LessThan(v) => sk < v.as_str(),
            SortKeyCondition::LessOrEqual(v) => sk <= v.as_str(),
            SortKeyCondition::GreaterThan(v) => sk > v.as_str(),
            SortKeyCondition::GreaterOrEqual(v) => sk >= v.as_str(),
        }
    }
}

/// One page request against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub partition_key: String,
    pub sort_key: Option<SortKeyCondition>,
    /// Max items in this page
    pub limit: Option<usize>,
    /// Resume strictly after this key
    pub exclusive_start_key: Option<Key>,
    /// Ascending sort-key order when true
    pub scan_forward: bool,
}

impl QueryRequest {
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
            limit: None,
            exclusive_start_key: None,
            scan_forward: true,
        }
    }

    pub fn sort_key(mut self, condition: SortKeyCondition) -> Self {
        self.sort_key = Some(condition);
        self
    }

    /// Shorthand for a `BeginsWith` sort-key condition
    pub fn prefix(self, prefix: impl Into<String>) -> Self {
        self.sort_key(SortKeyCondition::BeginsWith(prefix.into()))
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    /// True when `key` falls inside this query's key condition
    pub fn selects(&self, key: &Key) -> bool {
        key.pk == self.partition_key
            && self
                .sort_key
                .as_ref()
                .map_or(true, |condition| condition.matches(&key.sk))
    }
}

/// One page of results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Set when more matching items remain after this page
    pub last_evaluated_key: Option<Key>,
}
