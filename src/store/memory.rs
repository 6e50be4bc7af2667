//! In-memory store
//!
//! BTreeMap-per-table store behind a parking_lot RwLock. Ordered keys give
//! partition-local range scans for free; transactions take the write lock
//! for their whole duration, so they are atomic and isolated.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use parking_lot::RwLock;

use crate::config::DEFAULT_MAX_TRANSACTION_ITEMS;
use crate::error::{ParkError, Result};
use crate::item::{Item, Key};

use super::{snapshot, CompiledItem, QueryPage, QueryRequest, Store, WriteOutcome};

/// Default max items per query page
pub const DEFAULT_PAGE_SIZE: usize = 100;

type Table = BTreeMap<Key, Item>;

/// In-process implementation of [`Store`]
///
/// ## Concurrency:
/// - `tables`: RwLock (many concurrent readers, exclusive writer)
/// - Every write path takes the write lock once, evaluates all conditions
///   against staged state, then applies everything or nothing
pub struct MemoryStore {
    /// table name → ordered items
    tables: RwLock<HashMap<String, Table>>,

    /// Max items returned in one query page (simulates store page limits)
    page_size: usize,

    /// Max items in one transaction
    max_transaction_items: usize,
}

impl MemoryStore {
    /// Create an empty store with default limits
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
            max_transaction_items: DEFAULT_MAX_TRANSACTION_ITEMS,
        }
    }

    /// Set the per-page item cap
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the per-transaction item cap
    pub fn with_max_transaction_items(mut self, count: usize) -> Self {
        self.max_transaction_items = count.max(1);
        self
    }

    /// Insert an item unconditionally (seeding, tests)
    pub fn insert(&self, table: &str, item: Item) {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(item.key.clone(), item);
    }

    /// Number of items in a table
    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Names of all tables holding at least one item
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Get the page size
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write all tables to a snapshot file
    pub fn save(&self, path: &Path) -> Result<()> {
        let tables = self.tables.read();
        let contents: BTreeMap<String, Vec<Item>> = tables
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(name, table)| (name.clone(), table.values().cloned().collect()))
            .collect();
        snapshot::write(path, &contents)
    }

    /// Load a store from a snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = snapshot::read(path)?;
        let store = Self::new();
        {
            let mut tables = store.tables.write();
            for (name, items) in contents {
                let table = tables.entry(name).or_default();
                for item in items {
                    table.insert(item.key.clone(), item);
                }
            }
        }
        Ok(store)
    }

    /// Load a snapshot if the file exists, else start empty
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Evaluate and apply writes as one unit (caller holds no lock)
    fn apply_atomically(&self, items: &[CompiledItem]) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();

        // Stage results so later items in the same unit see earlier ones
        let mut staged: Vec<((String, Key), Option<Item>)> = Vec::with_capacity(items.len());
        let mut failed = Vec::new();

        for item in items {
            let current = staged
                .iter()
                .rev()
                .find(|((table, key), _)| *table == item.table && *key == item.key)
                .map(|(_, state)| state.clone())
                .unwrap_or_else(|| {
                    tables
                        .get(&item.table)
                        .and_then(|table| table.get(&item.key))
                        .cloned()
                });

            if let Some(condition) = &item.condition {
                if !condition.evaluate(current.as_ref()) {
                    failed.push(item.key.clone());
                    continue;
                }
            }

            let next = item.operation.apply(&item.key, current)?;
            staged.push(((item.table.clone(), item.key.clone()), next));
        }

        if !failed.is_empty() {
            return Ok(WriteOutcome::ConditionFailed(failed));
        }

        for ((table, key), state) in staged {
            let table = tables.entry(table).or_default();
            match state {
                Some(item) => {
                    table.insert(key, item);
                }
                None => {
                    table.remove(&key);
                }
            }
        }

        Ok(WriteOutcome::Committed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get(&self, table: &str, key: &Key) -> Result<Option<Item>> {
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|t| t.get(key))
            .cloned())
    }

    fn query(&self, table: &str, request: &QueryRequest) -> Result<QueryPage> {
        let tables = self.tables.read();
        let Some(table) = tables.get(table) else {
            return Ok(QueryPage::default());
        };

        // Step 1: Collect the partition's matching keys in sort order
        let start = Key::new(request.partition_key.clone(), "");
        let mut matching: Vec<&Item> = table
            .range(start..)
            .take_while(|(key, _)| key.pk == request.partition_key)
            .filter(|(key, _)| request.selects(key))
            .map(|(_, item)| item)
            .collect();

        if !request.scan_forward {
            matching.reverse();
        }

        // Step 2: Skip past the continuation key
        let offset = match &request.exclusive_start_key {
            Some(after) => matching
                .iter()
                .position(|item| {
                    if request.scan_forward {
                        item.key.sk > after.sk
                    } else {
                        item.key.sk < after.sk
                    }
                })
                .unwrap_or(matching.len()),
            None => 0,
        };

        // Step 3: Cut one page
        let page_limit = request
            .limit
            .map_or(self.page_size, |limit| limit.min(self.page_size))
            .max(1);
        let remaining = &matching[offset..];
        let take = remaining.len().min(page_limit);

        let items: Vec<Item> = remaining[..take].iter().map(|item| (*item).clone()).collect();
        let last_evaluated_key = if take < remaining.len() {
            items.last().map(|item| item.key.clone())
        } else {
            None
        };

        Ok(QueryPage {
            items,
            last_evaluated_key,
        })
    }

    fn conditional_write(&self, item: &CompiledItem) -> Result<WriteOutcome> {
        self.apply_atomically(std::slice::from_ref(item))
    }

    fn transact(&self, items: &[CompiledItem]) -> Result<WriteOutcome> {
        if items.len() > self.max_transaction_items {
            return Err(ParkError::TransactionTooLarge {
                size: items.len(),
                limit: self.max_transaction_items,
            });
        }
        if items.is_empty() {
            return Ok(WriteOutcome::Committed);
        }
        self.apply_atomically(items)
    }

    fn batch_get(&self, table: &str, keys: &[Key]) -> Result<Vec<Option<Item>>> {
        let tables = self.tables.read();
        let table = tables.get(table);
        Ok(keys
            .iter()
            .map(|key| table.and_then(|t| t.get(key)).cloned())
            .collect())
    }

    fn max_transaction_items(&self) -> usize {
        self.max_transaction_items
    }
}
