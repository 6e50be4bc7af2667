//! Engine Module
//!
//! The caller-facing entry points that coordinate all components.
//!
//! ## Responsibilities
//! - Validate, enrich and compile logical commands (create/update/delete)
//! - Commit compiled items in atomic chunks
//! - Run paginated queries, batch reads and identifier allocation
//!
//! ## Concurrency Model
//! The engine holds no mutable state: the store handle and the
//! [`EngineConfig`] are shared read-only, so one engine may serve many
//! requests at once. Cross-request safety comes from the store's
//! conditional writes; only the identifier allocator retries on conflict.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::allocator::IdentifierAllocator;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::item::{Item, Key};
use crate::mutation::{self, CommandMode, LogicalCommand, MutationConfig, PreparedBatch};
use crate::query::{QueryOptions, QueryResult, QueryRunner};
use crate::reader::{BatchReader, FetchMode, FetchResult};
use crate::store::{CompiledItem, QueryRequest, Store};
use crate::transaction::{BatchExecutor, CancelFlag, CommitReport};

/// The mutation and transaction engine
pub struct Engine {
    /// Backing store; lifecycle owned by the hosting process
    store: Arc<dyn Store>,

    /// Engine configuration
    config: EngineConfig,
}

impl Engine {
    /// Create an engine over an injected store handle
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Create an engine with the default config
    pub fn with_defaults(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validate, enrich and compile create commands
    pub fn create(
        &self,
        table: &str,
        commands: Vec<LogicalCommand>,
        config: &MutationConfig,
    ) -> Result<PreparedBatch> {
        self.prepare(table, commands, config, CommandMode::Create)
    }

    /// Validate, enrich and compile update commands
    pub fn update(
        &self,
        table: &str,
        commands: Vec<LogicalCommand>,
        config: &MutationConfig,
    ) -> Result<PreparedBatch> {
        self.prepare(table, commands, config, CommandMode::Update)
    }

    /// Compile delete commands (no field validation)
    pub fn delete(
        &self,
        table: &str,
        commands: Vec<LogicalCommand>,
        config: &MutationConfig,
    ) -> Result<PreparedBatch> {
        self.prepare(table, commands, config, CommandMode::Delete)
    }

    /// Commit a prepared batch
    pub fn commit(&self, batch: PreparedBatch) -> Result<CommitReport> {
        self.executor().execute(batch, None)
    }

    /// Commit compiled items from any mix of prepared batches
    pub fn commit_items(&self, items: Vec<CompiledItem>, fail_on_error: bool) -> Result<CommitReport> {
        self.commit(PreparedBatch::from_items(items, fail_on_error))
    }

    /// Commit, abandoning chunks not yet dispatched once `cancel` is set
    pub fn commit_with_cancel(&self, batch: PreparedBatch, cancel: &CancelFlag) -> Result<CommitReport> {
        self.executor().execute(batch, Some(cancel))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get one item
    pub fn get(&self, table: &str, key: &Key) -> Result<Option<Item>> {
        self.store.get(table, key)
    }

    /// Run a range query
    pub fn query(&self, table: &str, request: QueryRequest, options: QueryOptions) -> Result<QueryResult> {
        QueryRunner::new(self.store.as_ref(), self.config.max_query_pages).run(table, request, options)
    }

    /// Fetch named key groups concurrently
    pub fn batch_fetch(
        &self,
        table: &str,
        requests: BTreeMap<String, Vec<Key>>,
        mode: FetchMode,
    ) -> Result<Vec<FetchResult>> {
        BatchReader::new(self.store.as_ref(), self.config.max_batch_get_items).fetch(table, requests, mode)
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    /// Allocate the next identifier for a partition
    pub fn next_identifier(&self, table: &str, partition_key: &str, counter_key: &str) -> Result<u64> {
        IdentifierAllocator::new(self.store.as_ref(), &self.config).next(table, partition_key, counter_key)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the store handle
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn prepare(
        &self,
        table: &str,
        commands: Vec<LogicalCommand>,
        config: &MutationConfig,
        mode: CommandMode,
    ) -> Result<PreparedBatch> {
        let count = commands.len();
        let batch = mutation::prepare(self.store.as_ref(), table, commands, config, mode, Utc::now())?;
        info!(
            table,
            mode = ?mode,
            commands = count,
            compiled = batch.items.len(),
            rejected = batch.rejected.len(),
            "commands prepared"
        );
        Ok(batch)
    }

    fn executor(&self) -> BatchExecutor<'_> {
        BatchExecutor::new(self.store.as_ref(), self.config.max_transaction_items)
    }
}
