//! Tests for the Identifier Allocator
//!
//! These tests verify:
//! - Sequential allocation per partition
//! - Uniqueness under concurrent callers
//! - Bounded retries ending in AllocationContention

mod common;

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use common::FaultyStore;
use parkres::{Engine, EngineConfig, ErrorKind, Key, MemoryStore, ParkError, Store, Value};

const TABLE: &str = "reservations";

// =============================================================================
// Helper Functions
// =============================================================================

fn fast_config(retries: u32) -> EngineConfig {
    EngineConfig::builder()
        .allocator_max_retries(retries)
        .allocator_backoff_ms(1, 5)
        .build()
}

// =============================================================================
// Sequential Tests
// =============================================================================

#[test]
fn test_identifiers_start_at_one_and_increase() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), fast_config(3)).unwrap();

    let ids: Vec<u64> = (0..5)
        .map(|_| engine.next_identifier(TABLE, "park::1", "counter").unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let counter = store
        .get(TABLE, &Key::new("park::1", "counter"))
        .unwrap()
        .unwrap();
    assert_eq!(counter.attribute("lastIdentifier"), Some(&Value::Int(5)));
}

#[test]
fn test_counters_are_scoped_per_partition() {
    let engine = Engine::new(Arc::new(MemoryStore::new()), fast_config(3)).unwrap();

    assert_eq!(engine.next_identifier(TABLE, "park::1", "counter").unwrap(), 1);
    assert_eq!(engine.next_identifier(TABLE, "park::1", "counter").unwrap(), 2);
    assert_eq!(engine.next_identifier(TABLE, "park::2", "counter").unwrap(), 1);
    assert_eq!(engine.next_identifier(TABLE, "park::1", "counter").unwrap(), 3);
}

#[test]
fn test_custom_counter_field() {
    let store = Arc::new(MemoryStore::new());
    let config = EngineConfig::builder().counter_field("seq").build();
    let engine = Engine::new(store.clone(), config).unwrap();

    engine.next_identifier(TABLE, "park::1", "counter").unwrap();

    let counter = store
        .get(TABLE, &Key::new("park::1", "counter"))
        .unwrap()
        .unwrap();
    assert_eq!(counter.attribute("seq"), Some(&Value::Int(1)));
}

#[test]
fn test_missing_partition_rejected() {
    let engine = Engine::new(Arc::new(MemoryStore::new()), fast_config(3)).unwrap();

    let err = engine.next_identifier(TABLE, "", "counter").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingKey);
}

#[test]
fn test_maximum_retry_budget_allocates() {
    let engine = Engine::new(Arc::new(MemoryStore::new()), fast_config(u32::MAX)).unwrap();

    assert_eq!(engine.next_identifier(TABLE, "park::1", "counter").unwrap(), 1);
    assert_eq!(engine.next_identifier(TABLE, "park::1", "counter").unwrap(), 2);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_allocation_issues_each_value_once() {
    let engine = Arc::new(Engine::new(Arc::new(MemoryStore::new()), fast_config(1000)).unwrap());
    let num_threads = 8;
    let per_thread = 25;

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..per_thread)
                    .map(|_| engine.next_identifier(TABLE, "park::1", "counter").unwrap())
                    .collect::<Vec<u64>>()
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let unique: BTreeSet<u64> = all.iter().copied().collect();
    assert_eq!(all.len(), num_threads * per_thread);
    assert_eq!(unique.len(), num_threads * per_thread);
    assert_eq!(unique.iter().next(), Some(&1));
    assert_eq!(unique.iter().next_back(), Some(&200));
}

// =============================================================================
// Contention Tests
// =============================================================================

#[test]
fn test_gives_up_after_retry_budget() {
    let mut faulty = FaultyStore::new(MemoryStore::new());
    faulty.always_contended = true;
    let store = Arc::new(faulty);
    let engine = Engine::new(store.clone(), fast_config(3)).unwrap();

    let err = engine.next_identifier(TABLE, "park::1", "counter").unwrap_err();

    match &err {
        ParkError::AllocationContention { partition, attempts } => {
            assert_eq!(partition, "park::1");
            assert_eq!(*attempts, 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(store.conditional_writes.load(Ordering::SeqCst), 4);
}
