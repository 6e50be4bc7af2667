//! Configuration for parkres
//!
//! Process-wide engine settings with sensible defaults. Loaded once at
//! start-up and read-only afterwards; per-resource mutation rules live in
//! [`crate::mutation::MutationConfig`].

use crate::error::{ParkError, Result};

/// Common store limit on items per atomic transaction
pub const DEFAULT_MAX_TRANSACTION_ITEMS: usize = 100;

/// Common store limit on keys per batch-get request
pub const DEFAULT_MAX_BATCH_GET_ITEMS: usize = 100;

/// Main configuration for an engine instance
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // -------------------------------------------------------------------------
    // Transaction Configuration
    // -------------------------------------------------------------------------
    /// Max items submitted in one atomic transaction (chunk size)
    pub max_transaction_items: usize,

    // -------------------------------------------------------------------------
    // Read Configuration
    // -------------------------------------------------------------------------
    /// Max keys per underlying batch-get request
    pub max_batch_get_items: usize,

    /// Safety cap on pages followed by a non-paginated query (None = unbounded)
    pub max_query_pages: Option<usize>,

    // -------------------------------------------------------------------------
    // Identifier Allocator Configuration
    // -------------------------------------------------------------------------
    /// Retries after the first attempt before giving up
    pub allocator_max_retries: u32,

    /// Initial backoff between attempts (milliseconds)
    pub allocator_base_delay_ms: u64,

    /// Backoff ceiling (milliseconds)
    pub allocator_max_delay_ms: u64,

    /// Attribute on the counter item holding the last issued identifier
    pub counter_field: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_transaction_items: DEFAULT_MAX_TRANSACTION_ITEMS,
            max_batch_get_items: DEFAULT_MAX_BATCH_GET_ITEMS,
            max_query_pages: Some(1000),
            allocator_max_retries: 8,
            allocator_base_delay_ms: 10,
            allocator_max_delay_ms: 1000,
            counter_field: "lastIdentifier".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new config builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Check limits are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_transaction_items == 0 {
            return Err(ParkError::Config(
                "max_transaction_items must be at least 1".to_string(),
            ));
        }
        if self.max_batch_get_items == 0 {
            return Err(ParkError::Config(
                "max_batch_get_items must be at least 1".to_string(),
            ));
        }
        if self.max_query_pages == Some(0) {
            return Err(ParkError::Config(
                "max_query_pages must be at least 1 when set".to_string(),
            ));
        }
        if self.allocator_base_delay_ms > self.allocator_max_delay_ms {
            return Err(ParkError::Config(
                "allocator_base_delay_ms exceeds allocator_max_delay_ms".to_string(),
            ));
        }
        if self.counter_field.is_empty() {
            return Err(ParkError::Config("counter_field is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for EngineConfig
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the max items per atomic transaction
    pub fn max_transaction_items(mut self, count: usize) -> Self {
        self.config.max_transaction_items = count;
        self
    }

    /// Set the max keys per batch-get request
    pub fn max_batch_get_items(mut self, count: usize) -> Self {
        self.config.max_batch_get_items = count;
        self
    }

    /// Set the page safety cap for non-paginated queries
    pub fn max_query_pages(mut self, pages: Option<usize>) -> Self {
        self.config.max_query_pages = pages;
        self
    }

    /// Set the allocator retry budget
    pub fn allocator_max_retries(mut self, retries: u32) -> Self {
        self.config.allocator_max_retries = retries;
        self
    }

    /// Set the allocator backoff bounds (in milliseconds)
    pub fn allocator_backoff_ms(mut self, base: u64, max: u64) -> Self {
        self.config.allocator_base_delay_ms = base;
        self.config.allocator_max_delay_ms = max;
        self
    }

    /// Set the counter attribute name
    pub fn counter_field(mut self, field: impl Into<String>) -> Self {
        self.config.counter_field = field.into();
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
