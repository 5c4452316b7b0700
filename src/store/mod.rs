//! Store Module
//!
//! In-memory key-value state rebuilt from the transaction log.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Apply replayed log events during startup
//!
//! ## Data Structure Choice
//! A HashMap wrapped in a parking_lot RwLock:
//! - No ordering requirement (no range queries)
//! - Readers never observe a half-applied write
//! - Sorted snapshots are produced on demand

mod table;

pub use table::KeyValueStore;
