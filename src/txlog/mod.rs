//! Transaction Log Module
//!
//! Provides durability through an append-only, plain-text event log.
//!
//! ## Responsibilities
//! - Accept mutation submissions without blocking on disk I/O
//! - Assign strictly increasing sequence numbers in a single worker
//! - Persist one record per mutation, fail-stop on write errors
//! - Replay the full history on startup
//!
//! ## File Format
//! ```text
//! ┌──────────┬───┬──────┬───┬─────┬───┬───────┬────┐
//! │ sequence │\t │ type │\t │ key │\t │ value │ \n │
//! └──────────┴───┴──────┴───┴─────┴───┴───────┴────┘
//! ```
//! - `type`: 2 = Put, 1 = Delete (value left empty)
//! - A three-field line is read as a record with an empty value
//! - Keys and values escape `\`, tab, LF and CR as `\\`, `\t`, `\n`, `\r`
//! - No header, footer or checksum; corruption is caught by the
//!   monotonic-sequence check at read time
//!
//! ## Lifecycle
//! ```text
//! open() ──► Replaying ──run()──► Live ──close()──► Closed
//! ```
//! Submissions are only accepted while `Live`. `read_events` works in any
//! state because it reads through its own handle from the start of the file.

mod event;
mod log;
mod reader;
mod writer;

pub use event::{Event, EventType, MAX_SEQUENCE};
pub use log::{LogOptions, LogState, TransactionLog};
pub use reader::{read_events, LogReader};
pub use writer::LogWriter;
