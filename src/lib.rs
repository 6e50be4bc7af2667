//! # parkres
//!
//! The shared data-access layer of a parks/recreation reservation backend:
//! a configurable mutation and transaction engine over a partitioned
//! key-value store, with:
//! - Declarative field-level validation
//! - Automatic timestamps and optimistic-concurrency versions
//! - Stale-read (serial update) detection
//! - Atomic, size-capped multi-item transactions
//! - Paginated queries, parallel batch reads, race-safe identifier allocation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Resource Handlers                         │
//! │            (build LogicalCommands, read results)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │      create / update / delete / commit / query / ...         │
//! └───────┬──────────────────┬───────────────────┬──────────────┘
//!         │                  │                   │
//!         ▼                  ▼                   ▼
//!  ┌─────────────┐    ┌─────────────┐     ┌─────────────┐
//!  │  Mutation   │    │ Transaction │     │ Query/Reader│
//!  │ validate →  │───►│  Executor   │     │ /Allocator  │
//!  │ enrich →    │    │  (chunks)   │     │             │
//!  │ compile     │    └──────┬──────┘     └──────┬──────┘
//!  └─────────────┘           │                   │
//!                            ▼                   ▼
//!                    ┌─────────────────────────────────┐
//!                    │          Store (trait)           │
//!                    │  conditional writes, transact    │
//!                    └─────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod item;
pub mod store;
pub mod mutation;
pub mod transaction;
pub mod query;
pub mod allocator;
pub mod reader;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, ParkError, Result};
pub use config::EngineConfig;
pub use engine::Engine;
pub use item::{Item, Key, Value};
pub use mutation::{FieldChange, FieldRule, LogicalCommand, MutationConfig, PreparedBatch};
pub use query::{Cursor, QueryOptions, QueryResult};
pub use reader::{FetchMode, FetchResult};
pub use store::{MemoryStore, QueryRequest, SortKeyCondition, Store};
pub use transaction::{CancelFlag, CommitReport, OutcomeStatus};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of parkres
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
