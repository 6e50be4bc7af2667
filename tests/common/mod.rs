//! Shared test helpers: store wrappers that count, fail, or cancel

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use parkres::item::{Item, Key};
use parkres::store::{CompiledItem, QueryPage, QueryRequest, Store, WriteOutcome};
use parkres::transaction::CancelFlag;
use parkres::{MemoryStore, ParkError, Result};

// =============================================================================
// Counting Store
// =============================================================================

/// Delegates to a MemoryStore and counts calls
pub struct CountingStore {
    pub inner: MemoryStore,
    pub gets: AtomicUsize,
    pub queries: AtomicUsize,
    pub writes: AtomicUsize,
    pub transactions: AtomicUsize,
    pub batch_gets: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            transactions: AtomicUsize::new(0),
            batch_gets: AtomicUsize::new(0),
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }

    pub fn batch_gets(&self) -> usize {
        self.batch_gets.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Store for CountingStore {
    fn get(&self, table: &str, key: &Key) -> Result<Option<Item>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(table, key)
    }

    fn query(&self, table: &str, request: &QueryRequest) -> Result<QueryPage> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(table, request)
    }

    fn conditional_write(&self, item: &CompiledItem) -> Result<WriteOutcome> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.conditional_write(item)
    }

    fn transact(&self, items: &[CompiledItem]) -> Result<WriteOutcome> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        self.inner.transact(items)
    }

    fn batch_get(&self, table: &str, keys: &[Key]) -> Result<Vec<Option<Item>>> {
        self.batch_gets.fetch_add(1, Ordering::SeqCst);
        self.inner.batch_get(table, keys)
    }

    fn max_transaction_items(&self) -> usize {
        self.inner.max_transaction_items()
    }
}

// =============================================================================
// Faulty Store
// =============================================================================

/// Fails selected operations; everything else goes to the MemoryStore
pub struct FaultyStore {
    pub inner: MemoryStore,

    /// `batch_get` errors when any key is in this partition
    pub broken_partition: Option<String>,

    /// Every `transact` errors
    pub fail_transactions: bool,

    /// Every `conditional_write` reports a lost race
    pub always_contended: bool,

    /// Set after each successful `transact`
    pub cancel_after_transact: Option<CancelFlag>,

    pub conditional_writes: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            broken_partition: None,
            fail_transactions: false,
            always_contended: false,
            cancel_after_transact: None,
            conditional_writes: AtomicUsize::new(0),
        }
    }
}

impl Store for FaultyStore {
    fn get(&self, table: &str, key: &Key) -> Result<Option<Item>> {
        self.inner.get(table, key)
    }

    fn query(&self, table: &str, request: &QueryRequest) -> Result<QueryPage> {
        self.inner.query(table, request)
    }

    fn conditional_write(&self, item: &CompiledItem) -> Result<WriteOutcome> {
        self.conditional_writes.fetch_add(1, Ordering::SeqCst);
        if self.always_contended {
            return Ok(WriteOutcome::ConditionFailed(vec![item.key.clone()]));
        }
        self.inner.conditional_write(item)
    }

    fn transact(&self, items: &[CompiledItem]) -> Result<WriteOutcome> {
        if self.fail_transactions {
            return Err(ParkError::Store("injected transaction failure".to_string()));
        }
        let outcome = self.inner.transact(items)?;
        if let Some(flag) = &self.cancel_after_transact {
            flag.cancel();
        }
        Ok(outcome)
    }

    fn batch_get(&self, table: &str, keys: &[Key]) -> Result<Vec<Option<Item>>> {
        if let Some(broken) = &self.broken_partition {
            if keys.iter().any(|key| &key.pk == broken) {
                return Err(ParkError::Store(format!("partition {} unavailable", broken)));
            }
        }
        self.inner.batch_get(table, keys)
    }

    fn max_transaction_items(&self) -> usize {
        self.inner.max_transaction_items()
    }
}
