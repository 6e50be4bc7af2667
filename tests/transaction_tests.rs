//! Tests for the Batch Transaction Executor
//!
//! These tests verify:
//! - Chunking at the transaction cap, with per-chunk atomicity
//! - Partial failure reporting (fail-fast and collect modes)
//! - Cancellation between chunks
//! - Store errors and rejected commands in the commit report

mod common;

use std::sync::Arc;

use common::{CountingStore, FaultyStore};
use parkres::item::Item;
use parkres::mutation::rules::expect_integer;
use parkres::transaction::BatchExecutor;
use parkres::{
    CancelFlag, Engine, EngineConfig, ErrorKind, FieldRule, Key, LogicalCommand, MemoryStore,
    MutationConfig, OutcomeStatus, ParkError, Store,
};

const TABLE: &str = "reservations";

// =============================================================================
// Helper Functions
// =============================================================================

fn site_key(i: usize) -> Key {
    Key::new("campground::1", format!("site::{:03}", i))
}

fn site_commands(count: usize) -> Vec<LogicalCommand> {
    (0..count)
        .map(|i| LogicalCommand::new(site_key(i)).set("capacity", i as i64))
        .collect()
}

fn site_config(fail_on_error: bool) -> MutationConfig {
    MutationConfig::builder()
        .field("capacity", FieldRule::new().mandatory().rule(expect_integer()))
        .fail_on_error(fail_on_error)
        .build()
}

/// Store already holding site 120
fn store_with_conflict() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new().with_max_transaction_items(100));
    store.insert(TABLE, Item::new(site_key(120)));
    store
}

// =============================================================================
// Chunking Tests
// =============================================================================

#[test]
fn test_all_chunks_commit() {
    let store = Arc::new(CountingStore::new(MemoryStore::new()));
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(250), &site_config(true)).unwrap();
    let report = engine.commit(batch).unwrap();

    assert_eq!(report.committed, 250);
    assert!(report.is_complete());
    assert!(!report.is_partial());
    assert_eq!(store.transactions(), 3);
    assert_eq!(store.inner.len(TABLE), 250);
}

#[test]
fn test_chunk_size_clamped_to_store_limit() {
    let store = CountingStore::new(MemoryStore::new().with_max_transaction_items(10));
    let engine = Engine::with_defaults(Arc::new(MemoryStore::new()));

    let batch = engine.create(TABLE, site_commands(25), &site_config(true)).unwrap();
    let executor = BatchExecutor::new(&store, 100);
    assert_eq!(executor.chunk_size(), 10);

    let report = executor.execute(batch, None).unwrap();
    assert_eq!(report.committed, 25);
    assert_eq!(store.transactions(), 3);
}

#[test]
fn test_oversized_transaction_rejected_by_store() {
    let store = MemoryStore::new().with_max_transaction_items(2);
    let engine = Engine::with_defaults(Arc::new(MemoryStore::new()));
    let batch = engine.create(TABLE, site_commands(3), &site_config(true)).unwrap();

    let err = store.transact(&batch.items).unwrap_err();
    assert!(matches!(err, ParkError::TransactionTooLarge { size: 3, limit: 2 }));
    assert!(store.is_empty(TABLE));
}

// =============================================================================
// Partial Failure Tests
// =============================================================================

#[test]
fn test_collect_mode_reports_partial_failure() {
    let store = store_with_conflict();
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(150), &site_config(false)).unwrap();
    let report = engine.commit(batch).unwrap();

    assert_eq!(report.committed, 100);
    assert!(report.is_partial());
    assert_eq!(report.count(|s| *s == OutcomeStatus::Committed), 100);
    assert_eq!(report.count(|s| *s == OutcomeStatus::ConditionFailed), 1);
    assert_eq!(report.count(|s| *s == OutcomeStatus::RolledBack), 49);
    assert_eq!(report.condition_failed_keys(), vec![site_key(120)]);

    // First chunk durable, second chunk rolled back entirely
    assert!(store.get(TABLE, &site_key(99)).unwrap().is_some());
    assert!(store.get(TABLE, &site_key(100)).unwrap().is_none());
    assert!(store.get(TABLE, &site_key(149)).unwrap().is_none());
    assert_eq!(store.len(TABLE), 101);
}

#[test]
fn test_fail_fast_reports_partial_batch_failure() {
    let store = store_with_conflict();
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(150), &site_config(true)).unwrap();
    let err = engine.commit(batch).unwrap_err();

    match err {
        ParkError::PartialBatchFailure {
            committed,
            not_attempted,
            failed,
        } => {
            assert_eq!(committed, 100);
            assert_eq!(not_attempted, 0);
            assert_eq!(failed, vec![site_key(120)]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.len(TABLE), 101);
}

#[test]
fn test_fail_fast_single_chunk_is_condition_failed() {
    let store = Arc::new(MemoryStore::new());
    store.insert(TABLE, Item::new(site_key(3)));
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(5), &site_config(true)).unwrap();
    let err = engine.commit(batch).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConditionFailed);
    assert_eq!(err.keys(), vec![site_key(3)]);
    assert!(err.is_retryable());

    // Atomic: nothing from the chunk landed
    assert_eq!(store.len(TABLE), 1);
}

#[test]
fn test_fail_fast_stops_before_later_chunks() {
    let store = Arc::new(MemoryStore::new().with_max_transaction_items(10));
    store.insert(TABLE, Item::new(site_key(5)));
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(30), &site_config(true)).unwrap();
    let err = engine.commit(batch).unwrap_err();

    assert!(matches!(
        err,
        ParkError::PartialBatchFailure {
            committed: 0,
            not_attempted: 20,
            ..
        }
    ));
    assert_eq!(store.len(TABLE), 1);
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[test]
fn test_cancel_before_commit_dispatches_nothing() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let batch = engine.create(TABLE, site_commands(150), &site_config(true)).unwrap();
    let err = engine.commit_with_cancel(batch, &cancel).unwrap_err();

    assert!(matches!(
        err,
        ParkError::Cancelled {
            completed: 0,
            remaining: 150
        }
    ));
    assert!(store.is_empty(TABLE));
}

#[test]
fn test_cancel_between_chunks_keeps_committed_chunks() {
    let cancel = CancelFlag::new();
    let mut faulty = FaultyStore::new(MemoryStore::new());
    faulty.cancel_after_transact = Some(cancel.clone());
    let store = Arc::new(faulty);
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(150), &site_config(true)).unwrap();
    let err = engine.commit_with_cancel(batch, &cancel).unwrap_err();

    assert!(matches!(
        err,
        ParkError::Cancelled {
            completed: 100,
            remaining: 50
        }
    ));
    assert_eq!(store.inner.len(TABLE), 100);
}

#[test]
fn test_cancel_in_collect_mode_reports_not_attempted() {
    let cancel = CancelFlag::new();
    let mut faulty = FaultyStore::new(MemoryStore::new());
    faulty.cancel_after_transact = Some(cancel.clone());
    let store = Arc::new(faulty);
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(150), &site_config(false)).unwrap();
    let report = engine.commit_with_cancel(batch, &cancel).unwrap();

    assert_eq!(report.committed, 100);
    assert!(report.is_partial());
    assert_eq!(report.count(|s| *s == OutcomeStatus::NotAttempted), 50);
    assert_eq!(store.inner.len(TABLE), 100);
}

// =============================================================================
// Failure Outcome Tests
// =============================================================================

#[test]
fn test_store_error_recorded_as_failed_outcomes() {
    let mut faulty = FaultyStore::new(MemoryStore::new());
    faulty.fail_transactions = true;
    let engine = Engine::new(Arc::new(faulty), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(3), &site_config(false)).unwrap();
    let report = engine.commit(batch).unwrap();

    assert_eq!(report.committed, 0);
    assert!(!report.is_partial());
    assert!(report.has_failures());
    assert_eq!(
        report.count(|s| matches!(s, OutcomeStatus::Failed { .. })),
        3
    );
}

#[test]
fn test_store_error_fail_fast_propagates() {
    let mut faulty = FaultyStore::new(MemoryStore::new());
    faulty.fail_transactions = true;
    let engine = Engine::new(Arc::new(faulty), EngineConfig::default()).unwrap();

    let batch = engine.create(TABLE, site_commands(3), &site_config(true)).unwrap();
    let err = engine.commit(batch).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Store);
}

#[test]
fn test_rejected_commands_reported_in_outcomes() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), EngineConfig::default()).unwrap();

    let mut commands = site_commands(3);
    // Missing mandatory capacity
    commands.push(LogicalCommand::new(site_key(3)));
    // Wrong type
    commands.push(LogicalCommand::new(site_key(4)).set("capacity", "many"));

    let batch = engine.create(TABLE, commands, &site_config(false)).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.rejected.len(), 2);

    let report = engine.commit(batch).unwrap();
    assert_eq!(report.committed, 3);
    assert!(report.is_partial());

    let kinds: Vec<ErrorKind> = report
        .failures()
        .filter_map(|outcome| match &outcome.status {
            OutcomeStatus::Rejected { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![ErrorKind::MissingField, ErrorKind::InvalidFieldValue]);
    assert_eq!(store.len(TABLE), 3);
}

#[test]
fn test_fail_on_error_aborts_preparation() {
    let engine = Engine::with_defaults(Arc::new(MemoryStore::new()));

    let mut commands = site_commands(2);
    commands.push(LogicalCommand::new(site_key(2)));

    let err = engine.create(TABLE, commands, &site_config(true)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);
}
