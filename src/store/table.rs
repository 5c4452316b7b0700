//! KeyValueStore implementation
//!
//! HashMap-based store with RwLock for concurrency.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::{LedgerError, Result};
use crate::txlog::{Event, EventType};

/// Concurrent in-memory key-value store
///
/// Last write wins; deleting an absent key is a no-op.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    data: RwLock<HashMap<String, String>>,
}

impl KeyValueStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite the value for `key` (write lock)
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let mut data = self.data.write();
        data.insert(key.into(), value.into());
        Ok(())
    }

    /// Get the current value for `key` (read lock)
    pub fn get(&self, key: &str) -> Result<String> {
        let data = self.data.read();
        data.get(key).cloned().ok_or(LedgerError::NoSuchKey)
    }

    /// Remove `key` if present (write lock)
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut data = self.data.write();
        data.remove(key);
        Ok(())
    }

    /// Apply a replayed event
    pub fn apply(&self, event: &Event) -> Result<()> {
        match event.event_type {
            EventType::Put => self.put(event.key.as_str(), event.value.as_str()),
            EventType::Delete => self.delete(&event.key),
        }
    }

    /// Check whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Sorted copy of every entry, taken under a single read lock
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let data = self.data.read();
        data.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
