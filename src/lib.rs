//! # LedgerKV
//!
//! A single-node key-value store with:
//! - An append-only, plain-text transaction log for durability
//! - Asynchronous persistence through a bounded queue and a single worker
//! - Full replay of the log on startup, before any live write is accepted
//! - Single-writer/multi-reader concurrency model
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (store first, then log submission)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌────────────────┐
//!   │KeyValueStore│          │ TransactionLog │
//!   │  (RwLock)   │          │ (queue+worker) │
//!   └──────▲──────┘          └───────┬────────┘
//!          │                         │
//!          │   ReplayCoordinator     ▼
//!          └──────(startup)──── transaction.log
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod txlog;
pub mod replay;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LedgerError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::Engine;
pub use replay::{ReplayCoordinator, ReplayStats, Replayed};
pub use store::KeyValueStore;
pub use txlog::{Event, EventType, LogState, TransactionLog};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LedgerKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
