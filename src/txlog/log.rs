//! TransactionLog
//!
//! Owns the log lifecycle: replay reads, live submissions and shutdown.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::RwLock;

use super::writer::{spawn_worker, LogWriter, Submission};
use super::{reader, Event, EventType, MAX_SEQUENCE};
use crate::config::{Config, SyncStrategy};
use crate::error::{LedgerError, Result};

/// Lifecycle state of a transaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    /// File is open; history may be read, submissions are rejected
    Replaying,

    /// Persistence worker is running; submissions are accepted
    Live,

    /// Persistence worker stopped on a write error; submissions are rejected
    Failed,

    /// Submissions are rejected for good; file handle released
    Closed,
}

/// Tuning knobs for a transaction log
#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    pub sync_strategy: SyncStrategy,
    pub queue_capacity: usize,
    pub replay_buffer: usize,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions::from(&Config::default())
    }
}

impl From<&Config> for LogOptions {
    fn from(config: &Config) -> Self {
        Self {
            sync_strategy: config.sync_strategy,
            queue_capacity: config.queue_capacity,
            replay_buffer: config.replay_buffer,
        }
    }
}

struct Inner {
    state: LogState,

    /// File handle held between open() and run()
    file: Option<File>,

    /// Submission side of the bounded queue (Live only)
    sender: Option<Sender<Submission>>,

    worker: Option<JoinHandle<Result<()>>>,
}

/// Append-only, asynchronously persisted record of every mutation
///
/// ## Concurrency
/// - `write_put` / `write_delete` take a shared lock and `try_send` into a
///   bounded queue; they never wait on disk I/O
/// - A single worker thread owns the file write handle and the sequence counter
/// - `run` and `close` take the exclusive lock to change state
pub struct TransactionLog {
    path: PathBuf,
    options: LogOptions,
    inner: RwLock<Inner>,
    errors_tx: Sender<LedgerError>,
    errors_rx: Receiver<LedgerError>,

    /// Set by the worker when it fail-stops
    failed: Arc<AtomicBool>,
}

impl TransactionLog {
    /// Open or create the log file at `path`, entering `Replaying`
    pub fn open(path: impl AsRef<Path>, options: LogOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (errors_tx, errors_rx) = channel::unbounded();

        tracing::debug!(path = %path.display(), "transaction log opened");

        Ok(Self {
            path,
            options,
            inner: RwLock::new(Inner {
                state: LogState::Replaying,
                file: Some(file),
                sender: None,
                worker: None,
            }),
            errors_tx,
            errors_rx,
            failed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Read the whole log from the start on a background thread
    ///
    /// See [`reader::read_events`]. Safe in any state; it never touches the
    /// write handle.
    pub fn read_events(&self) -> (Receiver<Event>, Receiver<LedgerError>) {
        reader::read_events(&self.path, self.options.replay_buffer)
    }

    /// Start the persistence worker, entering `Live`
    ///
    /// `last_sequence` is the highest sequence number replayed; the first new
    /// event gets `last_sequence + 1`. Calling `run` on a live log is a no-op.
    /// A `last_sequence` with no successor fails with `SequenceExhausted` and
    /// leaves the log in `Replaying`.
    pub fn run(&self, last_sequence: u64) -> Result<()> {
        let mut inner = self.inner.write();
        match self.effective_state(inner.state) {
            LogState::Live => return Ok(()),
            LogState::Failed | LogState::Closed => return Err(LedgerError::LogUnavailable),
            LogState::Replaying => {}
        }

        if last_sequence >= MAX_SEQUENCE {
            return Err(LedgerError::SequenceExhausted {
                last: last_sequence,
            });
        }

        let file = inner.file.take().ok_or(LedgerError::LogUnavailable)?;
        let writer = LogWriter::from_file(file, self.options.sync_strategy, last_sequence)?;
        let (sender, receiver) = channel::bounded(self.options.queue_capacity.max(1));
        let worker = spawn_worker(
            writer,
            receiver,
            self.errors_tx.clone(),
            Arc::clone(&self.failed),
        )?;

        inner.sender = Some(sender);
        inner.worker = Some(worker);
        inner.state = LogState::Live;

        tracing::info!(
            path = %self.path.display(),
            next_sequence = last_sequence + 1,
            "transaction log live"
        );
        Ok(())
    }

    /// Submit a put event for asynchronous persistence
    pub fn write_put(&self, key: &str, value: &str) -> Result<()> {
        self.submit(Submission {
            event_type: EventType::Put,
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Submit a delete event for asynchronous persistence
    pub fn write_delete(&self, key: &str) -> Result<()> {
        self.submit(Submission {
            event_type: EventType::Delete,
            key: key.to_string(),
            value: String::new(),
        })
    }

    fn submit(&self, submission: Submission) -> Result<()> {
        let inner = self.inner.read();
        let sender = match (inner.state, inner.sender.as_ref()) {
            (LogState::Live, Some(sender)) => sender,
            _ => return Err(LedgerError::LogUnavailable),
        };

        match sender.try_send(submission) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(LedgerError::QueueFull {
                capacity: self.options.queue_capacity,
            }),
            Err(TrySendError::Disconnected(_)) => Err(LedgerError::LogUnavailable),
        }
    }

    /// Stream of asynchronous persistence failures
    pub fn errors(&self) -> Receiver<LedgerError> {
        self.errors_rx.clone()
    }

    /// Stop accepting submissions, drain the queue and release the file
    ///
    /// Events already queued are persisted before the file is closed.
    /// Calling `close` again is a no-op.
    pub fn close(&self) -> Result<()> {
        let worker = {
            let mut inner = self.inner.write();
            if inner.state == LogState::Closed {
                return Ok(());
            }
            inner.state = LogState::Closed;
            inner.sender = None;
            inner.file = None;
            inner.worker.take()
        };

        if let Some(worker) = worker {
            worker.join().map_err(|_| {
                LedgerError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "persistence worker panicked",
                ))
            })??;
        }

        tracing::info!(path = %self.path.display(), "transaction log closed");
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> LogState {
        self.effective_state(self.inner.read().state)
    }

    fn effective_state(&self, state: LogState) -> LogState {
        if state == LogState::Live && self.failed.load(Ordering::Acquire) {
            LogState::Failed
        } else {
            state
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TransactionLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("transaction log close on drop failed: {}", e);
        }
    }
}
