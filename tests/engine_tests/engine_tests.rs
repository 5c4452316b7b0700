//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Command execution
//! - Durability across reopen (replay)
//! - Behaviour once the log is closed
//! - Concurrent access patterns

use std::sync::Arc;
use std::thread;

use ledgerkv::config::{Config, SyncStrategy};
use ledgerkv::engine::Engine;
use ledgerkv::protocol::Command;
use ledgerkv::txlog::LogState;
use ledgerkv::LedgerError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite) // Sync every write for test reliability
        .queue_capacity(4096)
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    (temp_dir, engine)
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_log() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let engine = Engine::open_path(&data_dir).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("transaction.log").exists());
    assert_eq!(engine.log_path(), data_dir.join("transaction.log").as_path());
    assert_eq!(engine.log_state(), LogState::Live);
}

#[test]
fn test_engine_put_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("hello", "world").unwrap();

    assert_eq!(engine.get("hello").unwrap(), "world");
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(engine.get("nonexistent"), Err(LedgerError::NoSuchKey)));
}

#[test]
fn test_engine_delete() {
    let (_temp, engine) = setup_temp_engine();

    engine.put("k", "v").unwrap();
    engine.delete("k").unwrap();

    assert!(matches!(engine.get("k"), Err(LedgerError::NoSuchKey)));
}

#[test]
fn test_engine_delete_nonexistent_is_ok() {
    let (_temp, engine) = setup_temp_engine();

    engine.delete("never-written").unwrap();

    assert!(engine.is_empty());
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_commands() {
    let (_temp, engine) = setup_temp_engine();

    let put = engine
        .execute(Command::Put {
            key: "k".to_string(),
            value: "v".to_string(),
        })
        .unwrap();
    assert_eq!(put, None);

    let get = engine.execute(Command::Get { key: "k".to_string() }).unwrap();
    assert_eq!(get, Some("v".to_string()));

    let del = engine.execute(Command::Delete { key: "k".to_string() }).unwrap();
    assert_eq!(del, None);

    let missing = engine.execute(Command::Get { key: "k".to_string() });
    assert!(matches!(missing, Err(LedgerError::NoSuchKey)));

    let ping = engine.execute(Command::Ping).unwrap();
    assert_eq!(ping, Some("PONG".to_string()));
}

// =============================================================================
// Durability Tests
// =============================================================================

#[test]
fn test_reopen_replays_history() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        engine.put("a", "1").unwrap();
        engine.put("b", "2").unwrap();
        engine.put("a", "3").unwrap();
        engine.delete("b").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(&temp_dir)).unwrap();

    assert_eq!(engine.get("a").unwrap(), "3");
    assert!(matches!(engine.get("b"), Err(LedgerError::NoSuchKey)));
    assert_eq!(engine.len(), 1);

    let stats = engine.replay_stats();
    assert_eq!(stats.events_replayed, 4);
    assert_eq!(stats.puts, 3);
    assert_eq!(stats.deletes, 1);
    assert_eq!(stats.last_sequence, 4);
}

#[test]
fn test_reopen_without_explicit_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        for i in 0..50 {
            engine.put(&format!("key{}", i), &format!("value{}", i)).unwrap();
        }
        // Dropping the engine drains the queue
    }

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(engine.len(), 50);
    assert_eq!(engine.get("key49").unwrap(), "value49");
}

#[test]
fn test_multiple_restarts_keep_sequence_monotonic() {
    let temp_dir = TempDir::new().unwrap();

    for round in 0..3 {
        let engine = Engine::open(test_config(&temp_dir)).unwrap();
        assert_eq!(engine.replay_stats().last_sequence, round * 2);
        engine.put("counter", &round.to_string()).unwrap();
        engine.put(&format!("round{}", round), "done").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(engine.replay_stats().last_sequence, 6);
    assert_eq!(engine.get("counter").unwrap(), "2");
}

// =============================================================================
// Closed Log Tests
// =============================================================================

#[test]
fn test_put_after_close_reports_log_unavailable() {
    let (_temp, engine) = setup_temp_engine();

    engine.close().unwrap();
    let result = engine.put("k", "v");

    assert!(matches!(result, Err(LedgerError::LogUnavailable)));
    // The in-memory write is not rolled back
    assert_eq!(engine.get("k").unwrap(), "v");
    assert_eq!(engine.log_state(), LogState::Closed);
}

#[test]
fn test_close_twice() {
    let (_temp, engine) = setup_temp_engine();

    engine.close().unwrap();
    engine.close().unwrap();
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_puts_then_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Arc::new(Engine::open(test_config(&temp_dir)).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..100 {
                        engine.put(&format!("t{}-{}", t, i), &i.to_string()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 400);
        engine.close().unwrap();
    }

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(engine.len(), 400);
    assert_eq!(engine.replay_stats().last_sequence, 400);
}

#[test]
fn test_concurrent_same_key_writes_replay_to_live_value() {
    let temp_dir = TempDir::new().unwrap();

    let live_value = {
        let engine = Arc::new(Engine::open(test_config(&temp_dir)).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..250 {
                        if i % 50 == 49 {
                            engine.delete("k").unwrap();
                        } else {
                            engine.put("k", &format!("t{}-{}", t, i)).unwrap();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let live = engine.get("k").ok();
        engine.close().unwrap();
        live
    };

    let engine = Engine::open(test_config(&temp_dir)).unwrap();
    assert_eq!(engine.get("k").ok(), live_value);
    assert_eq!(engine.replay_stats().last_sequence, 1000);
}

#[test]
fn test_concurrent_readers_and_writer() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);
    engine.put("a", "before").unwrap();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            engine.put("a", "after").unwrap();
            engine.put("b", "other").unwrap();
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..200 {
                    let value = engine.get("a").unwrap();
                    assert!(value == "before" || value == "after");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(engine.get("a").unwrap(), "after");
    assert_eq!(engine.get("b").unwrap(), "other");
}
