//! Error types for LedgerKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Unified error type for LedgerKV operations
#[derive(Debug, Error)]
pub enum LedgerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("no such key")]
    NoSuchKey,

    // -------------------------------------------------------------------------
    // Transaction Log Errors
    // -------------------------------------------------------------------------
    /// The log is not accepting submissions (not live, closed, or its worker stopped)
    #[error("transaction log unavailable")]
    LogUnavailable,

    /// The bounded submission queue has no free slot
    #[error("transaction log queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("input parse error at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    #[error("transaction number out of sequence at line {line}: {sequence} is not greater than {last}")]
    SequenceViolation { line: u64, sequence: u64, last: u64 },

    /// No sequence number is left after `last`
    #[error("transaction sequence exhausted after {last}")]
    SequenceExhausted { last: u64 },

    #[error("transaction log persistence failed: {0}")]
    PersistenceFailure(std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    /// Whether this error aborts a replay pass
    pub fn is_replay_fatal(&self) -> bool {
        matches!(
            self,
            LedgerError::Parse { .. }
                | LedgerError::SequenceViolation { .. }
                | LedgerError::SequenceExhausted { .. }
                | LedgerError::Io(_)
        )
    }
}
