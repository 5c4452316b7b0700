//! Engine Module
//!
//! Routes client commands to the store and the transaction log.
//!
//! ## Responsibilities
//! - Run replay on startup (via [`ReplayCoordinator`])
//! - Apply each mutation to the store, then submit it to the log
//! - Expose the log's persistence error stream to the owning process
//! - Shut the log down in order

use std::path::Path;
use std::sync::Arc;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::protocol::Command;
use crate::replay::{ReplayCoordinator, ReplayStats};
use crate::store::KeyValueStore;
use crate::txlog::{LogState, TransactionLog};

/// The request-facing engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Reads** (get): take the store's read lock only
/// - **Writes** (put/delete): serialized by the engine's write mutex, held
///   across the store mutation and the log submission, so log order always
///   matches the order mutations reached the store
/// - Submission never waits for disk I/O, so the mutex is held briefly
pub struct Engine {
    config: Config,

    store: Arc<KeyValueStore>,

    log: TransactionLog,

    /// Single-writer lock tying store order to log order
    write_lock: Mutex<()>,

    replay_stats: ReplayStats,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// Replays the transaction log fully before accepting any mutation.
    pub fn open(config: Config) -> Result<Self> {
        let replayed = ReplayCoordinator::new(config.clone()).start()?;

        Ok(Self {
            config,
            store: replayed.store,
            log: replayed.log,
            write_lock: Mutex::new(()),
            replay_stats: replayed.stats,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<String>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some("PONG".to_string())),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Result<String> {
        self.store.get(key)
    }

    /// Put a key-value pair
    ///
    /// A log submission failure is returned to the caller; the in-memory
    /// write has already happened and is not rolled back.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let _writer = self.write_lock.lock();
        self.store.put(key, value)?;
        self.log.write_put(key, value).map_err(|e| {
            tracing::warn!(key, "put applied but not logged: {}", e);
            e
        })
    }

    /// Delete a key
    pub fn delete(&self, key: &str) -> Result<()> {
        let _writer = self.write_lock.lock();
        self.store.delete(key)?;
        self.log.write_delete(key).map_err(|e| {
            tracing::warn!(key, "delete applied but not logged: {}", e);
            e
        })
    }

    /// Stream of asynchronous persistence failures
    ///
    /// The owner must watch this: a failure means later mutations are no
    /// longer durable.
    pub fn log_errors(&self) -> Receiver<LedgerError> {
        self.log.errors()
    }

    /// Close the transaction log gracefully
    ///
    /// Pending submissions are persisted before the file is released.
    pub fn close(&self) -> Result<()> {
        self.log.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the transaction log file
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Lifecycle state of the transaction log
    pub fn log_state(&self) -> LogState {
        self.log.state()
    }

    /// Statistics from the startup replay
    pub fn replay_stats(&self) -> ReplayStats {
        self.replay_stats
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Shared handle to the underlying store
    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
