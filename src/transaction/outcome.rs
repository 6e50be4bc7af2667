//! Commit outcomes

use crate::error::ErrorKind;
use crate::item::Key;

/// What happened to one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Committed,

    /// This item's own condition did not hold
    ConditionFailed,

    /// Another item in the same chunk failed, so this one was rolled back
    RolledBack,

    /// Never submitted (earlier fail-fast abort or cancellation)
    NotAttempted,

    /// Failed validation during preparation
    Rejected { kind: ErrorKind, message: String },

    /// The store errored while submitting this item's chunk
    Failed { message: String },
}

/// Outcome for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub table: String,
    pub key: Key,
    pub status: OutcomeStatus,
}

/// Result of a commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Items durably committed
    pub committed: usize,

    pub outcomes: Vec<ItemOutcome>,
}

impl CommitReport {
    /// True when every item (and every prepared command) committed
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|outcome| outcome.status == OutcomeStatus::Committed)
    }

    /// True when some items failed while others committed
    pub fn is_partial(&self) -> bool {
        self.committed > 0 && self.has_failures()
    }

    pub fn has_failures(&self) -> bool {
        !self.is_complete()
    }

    /// Outcomes other than `Committed`
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status != OutcomeStatus::Committed)
    }

    /// Keys whose own condition failed
    pub fn condition_failed_keys(&self) -> Vec<Key> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == OutcomeStatus::ConditionFailed)
            .map(|outcome| outcome.key.clone())
            .collect()
    }

    /// Count outcomes matching a predicate
    pub fn count(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| predicate(&outcome.status))
            .count()
    }
}
