//! KeyValueStore Tests
//!
//! Tests verify:
//! - Put/Get/Delete semantics
//! - NoSuchKey on absent keys
//! - Idempotent delete
//! - Applying replayed events
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use ledgerkv::store::KeyValueStore;
use ledgerkv::txlog::Event;
use ledgerkv::LedgerError;

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_store_is_empty() {
    let store = KeyValueStore::new();
    assert_eq!(store.len(), 0);
    assert!(store.is_empty());
}

#[test]
fn test_put_and_get() {
    let store = KeyValueStore::new();

    store.put("key1", "value1").unwrap();

    assert_eq!(store.get("key1").unwrap(), "value1");
}

#[test]
fn test_get_nonexistent_key() {
    let store = KeyValueStore::new();

    let result = store.get("nonexistent");
    assert!(matches!(result, Err(LedgerError::NoSuchKey)));
}

#[test]
fn test_put_overwrites_existing() {
    let store = KeyValueStore::new();

    store.put("key1", "value1").unwrap();
    store.put("key1", "value2").unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("key1").unwrap(), "value2");
}

#[test]
fn test_empty_key_and_value_are_allowed() {
    let store = KeyValueStore::new();

    store.put("", "").unwrap();

    assert_eq!(store.get("").unwrap(), "");
    assert!(store.contains_key(""));
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_removes_key() {
    let store = KeyValueStore::new();

    store.put("key1", "value1").unwrap();
    store.delete("key1").unwrap();

    assert!(matches!(store.get("key1"), Err(LedgerError::NoSuchKey)));
    assert!(store.is_empty());
}

#[test]
fn test_delete_absent_key_is_noop() {
    let store = KeyValueStore::new();
    store.put("other", "x").unwrap();

    store.delete("missing").unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("other").unwrap(), "x");
}

#[test]
fn test_put_after_delete() {
    let store = KeyValueStore::new();

    store.put("k", "v1").unwrap();
    store.delete("k").unwrap();
    store.put("k", "v2").unwrap();

    assert_eq!(store.get("k").unwrap(), "v2");
}

// =============================================================================
// Event Application Tests
// =============================================================================

#[test]
fn test_apply_events() {
    let store = KeyValueStore::new();

    store.apply(&Event::put(1, "a", "1")).unwrap();
    store.apply(&Event::put(2, "b", "2")).unwrap();
    store.apply(&Event::put(3, "a", "3")).unwrap();
    store.apply(&Event::delete(4, "b")).unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("a").map(String::as_str), Some("3"));
}

#[test]
fn test_snapshot_is_sorted() {
    let store = KeyValueStore::new();
    for key in ["c", "a", "b"] {
        store.put(key, key).unwrap();
    }

    let keys: Vec<String> = store.snapshot().into_keys().collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_puts_on_different_keys() {
    let store = Arc::new(KeyValueStore::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..250 {
                    store.put(format!("t{}-k{}", t, i), format!("v{}", i)).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 8 * 250);
    assert_eq!(store.get("t3-k17").unwrap(), "v17");
}

#[test]
fn test_concurrent_reader_sees_whole_values() {
    let store = Arc::new(KeyValueStore::new());
    let old = "a".repeat(1024);
    let new = "b".repeat(1024);
    store.put("shared", old.as_str()).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let (old, new) = (old.clone(), new.clone());
        thread::spawn(move || {
            for i in 0..1000 {
                let value = if i % 2 == 0 { &new } else { &old };
                store.put("shared", value.as_str()).unwrap();
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..1000 {
                let value = store.get("shared").unwrap();
                assert!(value == old || value == new, "observed a torn value");
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}
