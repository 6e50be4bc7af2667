//! Identifier Allocator
//!
//! Hands out strictly increasing integers scoped to a partition key.
//!
//! ## Algorithm
//! 1. Read the counter item (value 0 when absent)
//! 2. Write `value + 1` on condition that the stored value is still `value`
//! 3. On condition failure another caller won: back off and retry
//!
//! The conditional write is the only synchronisation; an integer is issued
//! exactly once because only one writer can move the counter from `n`.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{ParkError, Result};
use crate::item::{Key, Value};
use crate::store::{CompiledItem, Condition, Operation, Store, UpdateExpression, WriteOutcome};

/// Allocates identifiers from per-partition counter items
pub struct IdentifierAllocator<'a> {
    store: &'a dyn Store,
    config: &'a EngineConfig,
}

impl<'a> IdentifierAllocator<'a> {
    pub fn new(store: &'a dyn Store, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// Allocate the next identifier for `partition_key`
    ///
    /// The counter lives on the item `(partition_key, counter_key)`.
    pub fn next(&self, table: &str, partition_key: &str, counter_key: &str) -> Result<u64> {
        let key = Key::new(partition_key, counter_key);
        if !key.is_complete() {
            return Err(ParkError::MissingKey {
                detail: format!("identifier counter needs partition and sort key, got {}", key),
            });
        }

        let field = self.config.counter_field.as_str();
        let attempts = self.config.allocator_max_retries.saturating_add(1);

        for attempt in 0..attempts {
            // Step 1: Read current value
            let current = self
                .store
                .get(table, &key)?
                .map_or(0, |item| item.version(field));
            let next = current + 1;

            // Step 2: Conditional increment
            let mut expression = UpdateExpression::default();
            expression.set.insert(field.to_string(), Value::from(next));
            let write = CompiledItem {
                table: table.to_string(),
                key: key.clone(),
                operation: Operation::Update(expression),
                condition: Some(Condition::version_equals(field, current)),
                version: None,
            };

            match self.store.conditional_write(&write)? {
                WriteOutcome::Committed => {
                    debug!(table, partition = partition_key, identifier = next, attempt, "identifier allocated");
                    return Ok(next);
                }
                WriteOutcome::ConditionFailed(_) => {
                    // Step 3: Lost the race; back off unless out of budget
                    if attempt + 1 < attempts {
                        let delay = backoff_delay(
                            attempt,
                            self.config.allocator_base_delay_ms,
                            self.config.allocator_max_delay_ms,
                        );
                        warn!(
                            table,
                            partition = partition_key,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "identifier counter contended, retrying"
                        );
                        thread::sleep(delay);
                    }
                }
            }
        }

        Err(ParkError::AllocationContention {
            partition: partition_key.to_string(),
            attempts,
        })
    }
}

/// Exponential backoff: `base * 2^attempt`, capped at `max`
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}
