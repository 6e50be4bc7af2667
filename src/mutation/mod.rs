//! Mutation Module
//!
//! Turns caller intent into store-ready writes.
//!
//! ## Pipeline (per command, in submission order)
//! ```text
//! LogicalCommand ──► validator ──► enricher ──► compiler ──► CompiledItem
//!                    (rules)      (timestamp,   (Put/Update/
//!                                  version,      Delete +
//!                                  serial)       condition)
//! ```
//! Validation runs before any store call. The enricher may read an item
//! once to learn its current version; nothing is written until commit.

mod command;
mod compiler;
mod config;
mod enricher;
pub mod rules;
mod validator;

pub use command::{FieldChange, LogicalCommand};
pub use compiler::{check_identity, compile};
pub use config::{ActionRule, ActionRules, FieldRule, MutationConfig, MutationConfigBuilder};
pub use enricher::{EnrichedCommand, Enricher};
pub use rules::{FieldValidator, RuleViolation};
pub use validator::{validate_command, validate_field};

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{ParkError, Result};
use crate::item::Key;
use crate::store::{CompiledItem, Store};

/// Engine-managed optimistic-concurrency counter
pub const VERSION_FIELD: &str = "version";

/// Engine-managed last-modified timestamp
pub const LAST_UPDATED_FIELD: &str = "lastUpdatedDate";

/// Engine-managed creation timestamp
pub const CREATION_DATE_FIELD: &str = "creationDate";

/// Action implied by a field change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Set,
    Remove,
    Add,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Set => write!(f, "set"),
            Action::Remove => write!(f, "remove"),
            Action::Add => write!(f, "add"),
        }
    }
}

/// Which entry point a command came through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandMode {
    Create,
    Update,
    Delete,
}

/// A command skipped by a non-fail-fast preparation
#[derive(Debug)]
pub struct Rejection {
    pub key: Key,
    pub error: ParkError,
}

/// Compiled writes ready for commit
#[derive(Debug)]
pub struct PreparedBatch {
    pub table: String,

    /// One compiled item per accepted command, in submission order
    pub items: Vec<CompiledItem>,

    /// Commands that failed validation (only when `fail_on_error` is off)
    pub rejected: Vec<Rejection>,

    pub fail_on_error: bool,
}

impl PreparedBatch {
    /// Wrap already-compiled items, possibly from several commands or tables
    pub fn from_items(items: Vec<CompiledItem>, fail_on_error: bool) -> Self {
        let table = items.first().map(|item| item.table.clone()).unwrap_or_default();
        Self {
            table,
            items,
            rejected: Vec::new(),
            fail_on_error,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// New version per compiled key (auto-versioned commands only)
    pub fn versions(&self) -> Vec<(Key, u64)> {
        self.items
            .iter()
            .filter_map(|item| item.version.map(|v| (item.key.clone(), v)))
            .collect()
    }
}

/// Validate, enrich, and compile a list of commands
///
/// With `fail_on_error` the first invalid command aborts with its error;
/// otherwise invalid commands are recorded in `rejected` and skipped.
pub fn prepare(
    store: &dyn Store,
    table: &str,
    commands: Vec<LogicalCommand>,
    config: &MutationConfig,
    mode: CommandMode,
    now: DateTime<Utc>,
) -> Result<PreparedBatch> {
    let mut enricher = Enricher::new(store, table, config, now);
    let mut items = Vec::with_capacity(commands.len());
    let mut rejected = Vec::new();

    for command in commands {
        let key = command.key.clone();
        match prepare_one(&mut enricher, table, command, config, mode) {
            Ok(item) => {
                debug!(table, item = %item, "compiled command");
                items.push(item);
            }
            Err(error) if config.fail_on_error || !error.is_validation_or_conflict() => {
                return Err(error);
            }
            Err(error) => {
                warn!(table, key = %key, error = %error, "skipping invalid command");
                rejected.push(Rejection { key, error });
            }
        }
    }

    Ok(PreparedBatch {
        table: table.to_string(),
        items,
        rejected,
        fail_on_error: config.fail_on_error,
    })
}

fn prepare_one(
    enricher: &mut Enricher<'_>,
    table: &str,
    command: LogicalCommand,
    config: &MutationConfig,
    mode: CommandMode,
) -> Result<CompiledItem> {
    // Step 1: Field rules (pure)
    validate_command(&command, config, mode)?;

    // Step 2: Identity guard before any read
    check_identity(&command, config, mode)?;

    // Step 3: Engine-managed fields and version conditions
    let enriched = enricher.enrich(command, mode)?;

    // Step 4: Store-ready write
    compile(table, enriched, mode, config)
}

impl ParkError {
    /// Errors that reject a single command rather than the whole request
    fn is_validation_or_conflict(&self) -> bool {
        self.is_validation() || matches!(self, ParkError::Conflict { .. })
    }
}

/// Parse a pair of path identifiers that must be given together
///
/// Empty strings count as absent. Returns `None` when neither is given and
/// `MissingKey` when exactly one is.
pub fn paired_identifier(
    first: Option<&str>,
    second: Option<&str>,
) -> Result<Option<(String, String)>> {
    let first = first.filter(|s| !s.is_empty());
    let second = second.filter(|s| !s.is_empty());
    match (first, second) {
        (Some(a), Some(b)) => Ok(Some((a.to_string(), b.to_string()))),
        (None, None) => Ok(None),
        (Some(a), None) => Err(ParkError::MissingKey {
            detail: format!("'{}' given without its paired identifier", a),
        }),
        (None, Some(b)) => Err(ParkError::MissingKey {
            detail: format!("'{}' given without its paired identifier", b),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_identifier_treats_empty_as_absent() {
        assert_eq!(paired_identifier(None, None).unwrap(), None);
        assert_eq!(paired_identifier(Some(""), Some("")).unwrap(), None);
        assert_eq!(
            paired_identifier(Some("permit"), Some("5")).unwrap(),
            Some(("permit".to_string(), "5".to_string()))
        );
        assert!(paired_identifier(Some("permit"), Some("")).is_err());
        assert!(paired_identifier(None, Some("5")).is_err());
    }
}
