//! Command Enricher
//!
//! Decorates a validated command with engine-managed fields and the
//! version conditions that make writes safe under concurrency.
//!
//! ## Versions
//! - `auto_version` detects concurrent writes: each write carries
//!   `version == base` and sets `version = base + 1`
//! - `enforce_serial_updates` detects stale reads: the caller's observed
//!   version is compared with the current one before anything is written
//!
//! Overwriting creates continue from the stored version instead of restarting
//! at 1.
//!
//! The current version of a key is learned once per batch (a single `get`)
//! and then tracked in memory, so later commands on the same key see the
//! version enriched by earlier ones.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::error::{ParkError, Result};
use crate::item::{Key, Value};
use crate::store::{Condition, Store};

use super::{
    CommandMode, FieldChange, LogicalCommand, MutationConfig, CREATION_DATE_FIELD,
    LAST_UPDATED_FIELD, VERSION_FIELD,
};

/// A command with engine-managed fields applied
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCommand {
    pub key: Key,
    pub data: BTreeMap<String, FieldChange>,

    /// Version guard to attach at compile time
    pub condition: Option<Condition>,

    /// Version the item carries after commit
    pub version: Option<u64>,
}

/// Stateful per-batch enricher
pub struct Enricher<'a> {
    store: &'a dyn Store,
    table: &'a str,
    config: &'a MutationConfig,
    timestamp: String,

    /// key → latest version known in this batch
    ledger: HashMap<Key, u64>,
}

impl<'a> Enricher<'a> {
    pub fn new(
        store: &'a dyn Store,
        table: &'a str,
        config: &'a MutationConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            store,
            table,
            config,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            ledger: HashMap::new(),
        }
    }

    /// Enrich one command
    pub fn enrich(&mut self, command: LogicalCommand, mode: CommandMode) -> Result<EnrichedCommand> {
        let LogicalCommand {
            key,
            mut data,
            expected_version,
        } = command;

        self.strip_managed(&mut data);

        let (condition, version) = match mode {
            CommandMode::Create => {
                if self.config.auto_timestamp {
                    data.insert(CREATION_DATE_FIELD.to_string(), self.stamp());
                    data.insert(LAST_UPDATED_FIELD.to_string(), self.stamp());
                }
                self.version_for_create(&key, &mut data)?
            }
            CommandMode::Update => {
                if self.config.auto_timestamp {
                    data.insert(LAST_UPDATED_FIELD.to_string(), self.stamp());
                }
                self.version_for_update(&key, expected_version, &mut data)?
            }
            CommandMode::Delete => {
                data.clear();
                self.version_for_delete(&key, expected_version)?
            }
        };

        Ok(EnrichedCommand {
            key,
            data,
            condition,
            version,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn stamp(&self) -> FieldChange {
        FieldChange::Set(Value::String(self.timestamp.clone()))
    }

    /// Caller-supplied values for engine-managed fields are discarded
    fn strip_managed(&self, data: &mut BTreeMap<String, FieldChange>) {
        if self.config.auto_version {
            data.remove(VERSION_FIELD);
        }
        if self.config.auto_timestamp {
            data.remove(LAST_UPDATED_FIELD);
            data.remove(CREATION_DATE_FIELD);
        }
    }

    /// Overwrites continue from the stored version rather than restarting at 1
    fn version_for_create(
        &mut self,
        key: &Key,
        data: &mut BTreeMap<String, FieldChange>,
    ) -> Result<(Option<Condition>, Option<u64>)> {
        if !self.config.auto_version {
            return Ok((None, None));
        }

        let (condition, version) = if self.config.allow_overwrite {
            let current = self.current_version(key)?;
            (Condition::version_equals(VERSION_FIELD, current), current + 1)
        } else {
            (Condition::AttributeNotExists(VERSION_FIELD.to_string()), 1)
        };
        data.insert(VERSION_FIELD.to_string(), FieldChange::Set(Value::from(version)));
        self.ledger.insert(key.clone(), version);
        Ok((Some(condition), Some(version)))
    }

    fn version_for_update(
        &mut self,
        key: &Key,
        expected: Option<u64>,
        data: &mut BTreeMap<String, FieldChange>,
    ) -> Result<(Option<Condition>, Option<u64>)> {
        let base = if self.config.enforce_serial_updates {
            self.check_serial(key, expected)?
        } else if self.config.auto_version {
            match expected {
                Some(v) => v,
                None => self.current_version(key)?,
            }
        } else {
            return Ok((None, None));
        };

        let condition = Some(Condition::version_equals(VERSION_FIELD, base));
        if !self.config.auto_version {
            return Ok((condition, None));
        }

        let next = base + 1;
        data.insert(VERSION_FIELD.to_string(), FieldChange::Set(Value::from(next)));
        self.ledger.insert(key.clone(), next);
        debug!(key = %key, base, next, "version enriched");
        Ok((condition, Some(next)))
    }

    fn version_for_delete(
        &mut self,
        key: &Key,
        expected: Option<u64>,
    ) -> Result<(Option<Condition>, Option<u64>)> {
        let base = if self.config.enforce_serial_updates {
            Some(self.check_serial(key, expected)?)
        } else if self.config.auto_version {
            expected
        } else {
            None
        };
        self.ledger.remove(key);
        Ok((base.map(|v| Condition::version_equals(VERSION_FIELD, v)), None))
    }

    /// Compare the caller's observed version with the current one
    fn check_serial(&mut self, key: &Key, observed: Option<u64>) -> Result<u64> {
        let current = self.current_version(key)?;
        let observed = observed.unwrap_or(current);
        if observed != current {
            warn!(key = %key, observed, current, "stale read detected");
            return Err(ParkError::Conflict {
                key: key.clone(),
                observed,
                current,
            });
        }
        Ok(current)
    }

    /// Version known in this batch, else fetched once from the store
    fn current_version(&mut self, key: &Key) -> Result<u64> {
        if let Some(version) = self.ledger.get(key) {
            return Ok(*version);
        }
        let version = self
            .store
            .get(self.table, key)?
            .map_or(0, |item| item.version(VERSION_FIELD));
        self.ledger.insert(key.clone(), version);
        Ok(version)
    }
}
