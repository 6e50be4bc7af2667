//! Batch Transaction Executor
//!
//! Chunks compiled items and submits each chunk as one atomic transaction.

use tracing::{info, warn};

use crate::error::{ParkError, Result};
use crate::mutation::{PreparedBatch, Rejection};
use crate::store::{CompiledItem, Store, WriteOutcome};

use super::{CancelFlag, CommitReport, ItemOutcome, OutcomeStatus};

/// Submits compiled items in atomic chunks
pub struct BatchExecutor<'a> {
    store: &'a dyn Store,

    /// Items per transaction (never above the store's own limit)
    chunk_size: usize,
}

impl<'a> BatchExecutor<'a> {
    /// Create an executor; `max_chunk` is clamped to the store's limit
    pub fn new(store: &'a dyn Store, max_chunk: usize) -> Self {
        let chunk_size = max_chunk.min(store.max_transaction_items()).max(1);
        Self { store, chunk_size }
    }

    /// Get the effective chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Commit a prepared batch
    ///
    /// Fail-fast batches return an error at the first failed chunk; others
    /// run every chunk and report failures as outcomes. Once cancelled, a
    /// fail-fast batch returns `Cancelled`; others mark the undispatched
    /// items `NotAttempted`.
    pub fn execute(&self, batch: PreparedBatch, cancel: Option<&CancelFlag>) -> Result<CommitReport> {
        let PreparedBatch {
            items,
            rejected,
            fail_on_error,
            table,
        } = batch;

        let mut report = CommitReport {
            committed: 0,
            outcomes: rejected
                .into_iter()
                .map(|rejection| rejected_outcome(&table, rejection))
                .collect(),
        };

        let total = items.len();
        for (index, chunk) in items.chunks(self.chunk_size).enumerate() {
            let dispatched = index * self.chunk_size;

            // Step 1: Abandon undispatched chunks once cancelled
            if cancel.map_or(false, CancelFlag::is_cancelled) {
                warn!(committed = report.committed, remaining = total - dispatched, "commit cancelled");
                if fail_on_error {
                    return Err(ParkError::Cancelled {
                        completed: report.committed,
                        remaining: total - dispatched,
                    });
                }
                push_all(&mut report, &items[dispatched..], OutcomeStatus::NotAttempted);
                break;
            }

            // Step 2: Submit the chunk as one transaction
            let not_attempted = total - dispatched - chunk.len();
            match self.store.transact(chunk) {
                Ok(WriteOutcome::Committed) => {
                    report.committed += chunk.len();
                    push_all(&mut report, chunk, OutcomeStatus::Committed);
                    info!(chunk = index, items = chunk.len(), "chunk committed");
                }
                Ok(WriteOutcome::ConditionFailed(keys)) => {
                    warn!(chunk = index, failing = keys.len(), "chunk rolled back on condition failure");
                    if fail_on_error {
                        return Err(if report.committed == 0 && not_attempted == 0 {
                            ParkError::ConditionFailed { keys }
                        } else {
                            ParkError::PartialBatchFailure {
                                committed: report.committed,
                                not_attempted,
                                failed: keys,
                            }
                        });
                    }
                    for item in chunk {
                        let status = if keys.contains(&item.key) {
                            OutcomeStatus::ConditionFailed
                        } else {
                            OutcomeStatus::RolledBack
                        };
                        report.outcomes.push(outcome(item, status));
                    }
                }
                Err(error) => {
                    warn!(chunk = index, error = %error, "chunk submission failed");
                    if fail_on_error {
                        if report.committed == 0 && not_attempted == 0 {
                            return Err(error);
                        }
                        return Err(ParkError::PartialBatchFailure {
                            committed: report.committed,
                            not_attempted,
                            failed: chunk.iter().map(|item| item.key.clone()).collect(),
                        });
                    }
                    let message = error.to_string();
                    push_all(&mut report, chunk, OutcomeStatus::Failed { message });
                }
            }
        }

        Ok(report)
    }
}

fn outcome(item: &CompiledItem, status: OutcomeStatus) -> ItemOutcome {
    ItemOutcome {
        table: item.table.clone(),
        key: item.key.clone(),
        status,
    }
}

fn push_all(report: &mut CommitReport, chunk: &[CompiledItem], status: OutcomeStatus) {
    report
        .outcomes
        .extend(chunk.iter().map(|item| outcome(item, status.clone())));
}

fn rejected_outcome(table: &str, rejection: Rejection) -> ItemOutcome {
    let Rejection { key, error } = rejection;
    ItemOutcome {
        table: table.to_string(),
        key,
        status: OutcomeStatus::Rejected {
            kind: error.kind(),
            message: error.to_string(),
        },
    }
}
