//! Log Reader
//!
//! Handles reading events back from the transaction log.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines, Read};
use std::path::Path;
use std::thread;

use crossbeam::channel::{self, Receiver};

use super::Event;
use crate::error::{LedgerError, Result};

/// Reads events from a transaction log, enforcing sequence order
///
/// Reading stops at the first malformed line or sequence violation; that
/// error is yielded once and the iterator is fused afterwards.
pub struct LogReader<R: Read> {
    lines: Lines<BufReader<R>>,
    line_no: u64,
    last_sequence: u64,
    done: bool,
}

impl LogReader<File> {
    /// Open a log file for reading from the beginning
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> LogReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            line_no: 0,
            last_sequence: 0,
            done: false,
        }
    }

    /// Highest sequence number read so far in this pass
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Read the next event, or `None` at end of file
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        let line = match self.lines.next() {
            None => return Ok(None),
            Some(Ok(line)) => line,
            Some(Err(e)) if e.kind() == ErrorKind::InvalidData => {
                return Err(LedgerError::Parse {
                    line: self.line_no + 1,
                    reason: e.to_string(),
                });
            }
            Some(Err(e)) => return Err(LedgerError::Io(e)),
        };
        self.line_no += 1;

        let event = Event::decode(&line, self.line_no)?;
        if event.sequence <= self.last_sequence {
            return Err(LedgerError::SequenceViolation {
                line: self.line_no,
                sequence: event.sequence,
                last: self.last_sequence,
            });
        }

        self.last_sequence = event.sequence;
        Ok(Some(event))
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Stream every event of the log at `path` from a background reader thread
///
/// Events arrive in file order on the first receiver, through a channel of
/// `buffer` slots. At most one error arrives on the second receiver; both
/// channels disconnect when the reader thread finishes.
pub fn read_events(path: &Path, buffer: usize) -> (Receiver<Event>, Receiver<LedgerError>) {
    let (event_tx, event_rx) = channel::bounded(buffer.max(1));
    let (error_tx, error_rx) = channel::bounded(1);

    let path = path.to_path_buf();
    let spawn_error_tx = error_tx.clone();

    let spawned = thread::Builder::new()
        .name("txlog-reader".to_string())
        .spawn(move || {
            let reader = match LogReader::open(&path) {
                Ok(reader) => reader,
                Err(e) => {
                    let _ = error_tx.send(e);
                    return;
                }
            };

            for item in reader {
                match item {
                    Ok(event) => {
                        tracing::trace!(sequence = event.sequence, "read event");
                        if event_tx.send(event).is_err() {
                            tracing::debug!("replay consumer went away, stopping reader");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("transaction log read stopped: {}", e);
                        let _ = error_tx.send(e);
                        return;
                    }
                }
            }
        });

    if let Err(e) = spawned {
        let _ = spawn_error_tx.send(LedgerError::Io(e));
    }

    (event_rx, error_rx)
}
