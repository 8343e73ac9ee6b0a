//! Tests for concurrent access to one Store
//!
//! These tests verify:
//! - Concurrent appends from many threads are all recoverable
//! - No torn writes: every payload comes back intact with its timestamp
//! - Readers running alongside writers always see a consistent file

use std::collections::BTreeSet;
use std::io::Cursor;

use logdb::Store;

// =============================================================================
// Helper Functions
// =============================================================================

const THREADS: u64 = 8;
const PER_THREAD: u64 = 50;

fn timestamp_for(thread: u64, i: u64) -> u64 {
    thread * 1_000 + i
}

fn payload_for(thread: u64, i: u64) -> Vec<u8> {
    // Varying lengths make a torn write show up as a payload mismatch
    format!("thread-{}-record-{}-{}", thread, i, "#".repeat((i % 9) as usize)).into_bytes()
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_concurrent_appends_are_all_recoverable() {
    let store = Store::create(4, 8, Cursor::new(Vec::new())).unwrap();

    crossbeam::scope(|s| {
        for thread in 0..THREADS {
            let store = &store;
            s.spawn(move |_| {
                for i in 0..PER_THREAD {
                    store
                        .append_bytes(timestamp_for(thread, i), &payload_for(thread, i))
                        .unwrap();
                }
            });
        }
    })
    .unwrap();

    let records = store.records().unwrap();
    assert_eq!(records.len() as u64, THREADS * PER_THREAD);

    let expected: BTreeSet<(u64, Vec<u8>)> = (0..THREADS)
        .flat_map(|t| (0..PER_THREAD).map(move |i| (timestamp_for(t, i), payload_for(t, i))))
        .collect();
    let actual: BTreeSet<(u64, Vec<u8>)> = records
        .iter()
        .map(|r| (r.timestamp, r.payload.to_vec()))
        .collect();
    assert_eq!(actual, expected);

    assert!(store.audit().unwrap().iter().all(|a| a.is_consistent()));
}

#[test]
fn test_per_thread_order_is_preserved() {
    let store = Store::create(3, 5, Cursor::new(Vec::new())).unwrap();

    crossbeam::scope(|s| {
        for thread in 0..4 {
            let store = &store;
            s.spawn(move |_| {
                for i in 0..PER_THREAD {
                    store
                        .append_bytes(timestamp_for(thread, i), &payload_for(thread, i))
                        .unwrap();
                }
            });
        }
    })
    .unwrap();

    // Interleaving across threads is unspecified; within a thread it is not
    let records = store.records().unwrap();
    for thread in 0..4 {
        let seen: Vec<u64> = records
            .iter()
            .map(|r| r.timestamp)
            .filter(|ts| ts / 1_000 == thread)
            .collect();
        let expected: Vec<u64> = (0..PER_THREAD).map(|i| timestamp_for(thread, i)).collect();
        assert_eq!(seen, expected);
    }
}

// =============================================================================
// Mixed Read/Write Tests
// =============================================================================

#[test]
fn test_readers_see_consistent_state_during_appends() {
    let store = Store::create(2, 4, Cursor::new(Vec::new())).unwrap();

    crossbeam::scope(|s| {
        for thread in 0..4 {
            let store = &store;
            s.spawn(move |_| {
                for i in 0..PER_THREAD {
                    store
                        .append_bytes(timestamp_for(thread, i), &payload_for(thread, i))
                        .unwrap();
                }
            });
        }

        let store = &store;
        s.spawn(move |_| {
            let mut last_count = 0;
            for _ in 0..50 {
                let records = store.records().unwrap();
                assert!(records.len() >= last_count);
                last_count = records.len();

                for audit in store.audit().unwrap() {
                    assert!(audit.is_consistent(), "{:?}", audit);
                }
            }
        });
    })
    .unwrap();

    assert_eq!(store.records().unwrap().len() as u64, 4 * PER_THREAD);
}
