//! Log Writer
//!
//! Appends records to the transaction log and runs the persistence worker.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};

use super::event::{encode_record, MAX_SEQUENCE};
use super::EventType;
use crate::config::SyncStrategy;
use crate::error::{LedgerError, Result};

/// Appends records to the log file and owns the sequence counter
pub struct LogWriter {
    file: File,
    next_sequence: u64,
    sync_strategy: SyncStrategy,
    unsynced: usize,
}

/// A mutation waiting in the submission queue (no sequence number yet)
#[derive(Debug)]
pub(crate) struct Submission {
    pub event_type: EventType,
    pub key: String,
    pub value: String,
}

impl LogWriter {
    /// Open or create a log file for appending
    ///
    /// `last_sequence` is the highest sequence already in the file (0 for a new log).
    pub fn open(path: &Path, sync_strategy: SyncStrategy, last_sequence: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::from_file(file, sync_strategy, last_sequence)
    }

    /// Fails with `SequenceExhausted` when `last_sequence` leaves no room for
    /// another record.
    pub(crate) fn from_file(
        file: File,
        sync_strategy: SyncStrategy,
        last_sequence: u64,
    ) -> Result<Self> {
        if last_sequence >= MAX_SEQUENCE {
            return Err(LedgerError::SequenceExhausted {
                last: last_sequence,
            });
        }

        Ok(Self {
            file,
            next_sequence: last_sequence + 1,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append one record, returning the sequence number it was given
    pub fn append(&mut self, event_type: EventType, key: &str, value: &str) -> Result<u64> {
        let sequence = self.next_sequence;
        if sequence > MAX_SEQUENCE {
            return Err(LedgerError::SequenceExhausted { last: MAX_SEQUENCE });
        }
        let line = encode_record(sequence, event_type, key, value);
        self.file.write_all(line.as_bytes())?;

        self.next_sequence += 1;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }

        Ok(sequence)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Sequence number the next record will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Records written since the last sync
    pub fn unsynced_count(&self) -> usize {
        self.unsynced
    }
}

/// Spawn the single persistence worker
///
/// The worker drains `submissions` in order until every sender is dropped,
/// then syncs once more and returns the result of that final sync. A failed
/// append sets `failed`, is reported on `errors` and stops the worker;
/// dropping the receiver makes every later submission fail with
/// `LogUnavailable`.
pub(crate) fn spawn_worker(
    mut writer: LogWriter,
    submissions: Receiver<Submission>,
    errors: Sender<LedgerError>,
    failed: Arc<AtomicBool>,
) -> Result<JoinHandle<Result<()>>> {
    let handle = thread::Builder::new()
        .name("txlog-writer".to_string())
        .spawn(move || {
            tracing::debug!(next_sequence = writer.next_sequence(), "persistence worker started");

            for submission in submissions.iter() {
                match writer.append(submission.event_type, &submission.key, &submission.value) {
                    Ok(sequence) => {
                        tracing::trace!(sequence, key = %submission.key, "persisted event");
                    }
                    Err(e) => {
                        let failure = match e {
                            LedgerError::Io(io) => LedgerError::PersistenceFailure(io),
                            other => other,
                        };
                        tracing::error!("persistence worker stopping: {}", failure);
                        failed.store(true, Ordering::Release);
                        let _ = errors.send(failure);
                        return Ok(());
                    }
                }
            }

            tracing::debug!(next_sequence = writer.next_sequence(), "submission queue drained");
            writer.sync()
        })?;

    Ok(handle)
}
