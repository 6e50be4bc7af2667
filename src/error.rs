//! Error types for parkres
//!
//! Provides a unified error type for all engine operations, plus a
//! machine-checkable [`ErrorKind`] so callers can decide whether to retry,
//! merge, or surface a failure to an end user.

use std::fmt;

use thiserror::Error;

use crate::item::Key;
use crate::mutation::Action;

/// Result type alias using ParkError
pub type Result<T> = std::result::Result<T, ParkError>;

/// Unified error type for parkres operations
#[derive(Debug, Error)]
pub enum ParkError {
    // -------------------------------------------------------------------------
    // Validation Errors (raised before any store call)
    // -------------------------------------------------------------------------
    #[error("Missing mandatory field '{field}' on {key}")]
    MissingField { key: Key, field: String },

    #[error("Missing key: {detail}")]
    MissingKey { detail: String },

    #[error("Field '{field}' is forbidden for action '{action}' on {key}")]
    ForbiddenField {
        key: Key,
        field: String,
        action: Action,
    },

    #[error("Invalid value for field '{field}' on {key}: {message}")]
    InvalidFieldValue {
        key: Key,
        field: String,
        message: String,
    },

    #[error("Field '{field}' is immutable and cannot be updated on {key}")]
    ImmutableField { key: Key, field: String },

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Stale read on {key}: observed version {observed}, current version {current}")]
    Conflict {
        key: Key,
        observed: u64,
        current: u64,
    },

    #[error("Condition failed for {}", format_keys(.keys))]
    ConditionFailed { keys: Vec<Key> },

    #[error("Identifier allocation for partition '{partition}' gave up after {attempts} attempts")]
    AllocationContention { partition: String, attempts: u32 },

    // -------------------------------------------------------------------------
    // Batch Errors
    // -------------------------------------------------------------------------
    #[error(
        "Batch partially failed: {committed} committed, {not_attempted} not attempted, failing keys: {}",
        format_keys(.failed)
    )]
    PartialBatchFailure {
        committed: usize,
        not_attempted: usize,
        failed: Vec<Key>,
    },

    #[error("Operation cancelled: {completed} completed, {remaining} abandoned")]
    Cancelled { completed: usize, remaining: usize },

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store error: {0}")]
    Store(String),

    #[error("Transaction of {size} items exceeds store limit of {limit}")]
    TransactionTooLarge { size: usize, limit: usize },

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot corruption detected: {0}")]
    SnapshotCorruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Machine-checkable classification of a [`ParkError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingField,
    MissingKey,
    ForbiddenField,
    InvalidFieldValue,
    ImmutableField,
    Conflict,
    ConditionFailed,
    AllocationContention,
    PartialBatchFailure,
    Cancelled,
    Store,
    InvalidCursor,
    Serialization,
    Config,
}

impl ParkError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParkError::MissingField { .. } => ErrorKind::MissingField,
            ParkError::MissingKey { .. } => ErrorKind::MissingKey,
            ParkError::ForbiddenField { .. } => ErrorKind::ForbiddenField,
            ParkError::InvalidFieldValue { .. } => ErrorKind::InvalidFieldValue,
            ParkError::ImmutableField { .. } => ErrorKind::ImmutableField,
            ParkError::Conflict { .. } => ErrorKind::Conflict,
            ParkError::ConditionFailed { .. } => ErrorKind::ConditionFailed,
            ParkError::AllocationContention { .. } => ErrorKind::AllocationContention,
            ParkError::PartialBatchFailure { .. } => ErrorKind::PartialBatchFailure,
            ParkError::Cancelled { .. } => ErrorKind::Cancelled,
            ParkError::Store(_) | ParkError::TransactionTooLarge { .. } | ParkError::Io(_) => {
                ErrorKind::Store
            }
            ParkError::InvalidCursor(_) => ErrorKind::InvalidCursor,
            ParkError::Serialization(_) | ParkError::SnapshotCorruption(_) => {
                ErrorKind::Serialization
            }
            ParkError::Config(_) => ErrorKind::Config,
        }
    }

    /// True when a re-read-and-retry by the caller may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Conflict | ErrorKind::ConditionFailed | ErrorKind::AllocationContention
        )
    }

    /// True for errors detected before any store interaction
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingField
                | ErrorKind::MissingKey
                | ErrorKind::ForbiddenField
                | ErrorKind::InvalidFieldValue
                | ErrorKind::ImmutableField
        )
    }

    /// Key(s) this error is about, when known
    pub fn keys(&self) -> Vec<Key> {
        match self {
            ParkError::MissingField { key, .. }
            | ParkError::ForbiddenField { key, .. }
            | ParkError::InvalidFieldValue { key, .. }
            | ParkError::ImmutableField { key, .. }
            | ParkError::Conflict { key, .. } => vec![key.clone()],
            ParkError::ConditionFailed { keys } => keys.clone(),
            ParkError::PartialBatchFailure { failed, .. } => failed.clone(),
            _ => Vec::new(),
        }
    }

    /// Field name this error is about, when known
    pub fn field(&self) -> Option<&str> {
        match self {
            ParkError::MissingField { field, .. }
            | ParkError::ForbiddenField { field, .. }
            | ParkError::InvalidFieldValue { field, .. }
            | ParkError::ImmutableField { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<bincode::Error> for ParkError {
    fn from(err: bincode::Error) -> Self {
        ParkError::Serialization(err.to_string())
    }
}

fn format_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
