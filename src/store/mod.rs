//! Store Module
//!
//! The backing-store contract consumed by the engine, plus an in-process
//! reference implementation.
//!
//! ## Responsibilities
//! - Point reads and batch reads by composite key
//! - Paged range queries within one partition
//! - Conditional single-item writes
//! - All-or-nothing multi-item transactions, capped in size
//!
//! The engine never holds locks across items: atomicity and cross-request
//! safety come entirely from the store's conditional writes.

mod condition;
mod memory;
mod operation;
mod range;
mod snapshot;

pub use condition::Condition;
pub use memory::MemoryStore;
pub use operation::{ActionKind, CompiledItem, Operation, UpdateExpression};
pub use range::{QueryPage, QueryRequest, SortKeyCondition};

use crate::config::DEFAULT_MAX_TRANSACTION_ITEMS;
use crate::error::Result;
use crate::item::{Item, Key};

/// Result of a conditional write or transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Committed,

    /// Nothing was applied; these keys' conditions did not hold
    ConditionFailed(Vec<Key>),
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed)
    }
}

/// A partitioned key-value store with conditional writes
///
/// Condition failures are reported as [`WriteOutcome::ConditionFailed`],
/// not as errors; `Err` is reserved for the store itself misbehaving.
pub trait Store: Send + Sync {
    /// Get one item
    fn get(&self, table: &str, key: &Key) -> Result<Option<Item>>;

    /// Fetch one page of a range query
    fn query(&self, table: &str, request: &QueryRequest) -> Result<QueryPage>;

    /// Apply one write if its condition holds
    fn conditional_write(&self, item: &CompiledItem) -> Result<WriteOutcome>;

    /// Apply every write or none of them
    fn transact(&self, items: &[CompiledItem]) -> Result<WriteOutcome>;

    /// Get many items from one table, positionally aligned with `keys`
    fn batch_get(&self, table: &str, keys: &[Key]) -> Result<Vec<Option<Item>>>;

    /// Max items accepted by one `transact` call
    fn max_transaction_items(&self) -> usize {
        DEFAULT_MAX_TRANSACTION_ITEMS
    }
}
