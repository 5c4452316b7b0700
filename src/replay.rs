//! Replay Coordinator
//!
//! Rebuilds the store from the transaction log on startup.
//!
//! ## Startup Sequence
//! 1. Create the data directory and open/create the log (`Replaying`)
//! 2. Stream every persisted event and apply it to a fresh store, while
//!    watching the reader's error stream
//! 3. Abort on the first error; otherwise start the persistence worker
//!    (`Live`) at the highest replayed sequence
//!
//! The worker is started only after the reader has finished, so the live
//! writer and the replay reader never touch the file at the same time.

use std::fs;
use std::sync::Arc;

use crossbeam::channel::{Receiver, RecvError};
use crossbeam::select;

use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::store::KeyValueStore;
use crate::txlog::{Event, EventType, LogOptions, TransactionLog};

/// Statistics from a replay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Number of events applied to the store
    pub events_replayed: u64,

    pub puts: u64,

    pub deletes: u64,

    /// Highest sequence number seen (0 for an empty log)
    pub last_sequence: u64,
}

impl ReplayStats {
    fn record(&mut self, event: &Event) {
        self.events_replayed += 1;
        self.last_sequence = event.sequence;
        match event.event_type {
            EventType::Put => self.puts += 1,
            EventType::Delete => self.deletes += 1,
        }
    }
}

/// A store rebuilt from history, with its log ready for live writes
pub struct Replayed {
    pub store: Arc<KeyValueStore>,
    pub log: TransactionLog,
    pub stats: ReplayStats,
}

/// Drives startup: replay first, then go live
pub struct ReplayCoordinator {
    config: Config,
}

impl ReplayCoordinator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Replay the log into a fresh store and switch the log to live mode
    pub fn start(self) -> Result<Replayed> {
        self.config.validate()?;
        fs::create_dir_all(&self.config.data_dir)?;

        let log_path = self.config.log_path();
        let log = TransactionLog::open(&log_path, LogOptions::from(&self.config))?;
        let store = Arc::new(KeyValueStore::new());

        tracing::info!(path = %log_path.display(), "replaying transaction log");

        let (events, errors) = log.read_events();
        let stats = match apply_all(&store, &events, &errors) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("transaction log replay failed: {}", e);
                return Err(e);
            }
        };

        tracing::info!(
            events = stats.events_replayed,
            puts = stats.puts,
            deletes = stats.deletes,
            last_sequence = stats.last_sequence,
            keys = store.len(),
            "replay complete"
        );

        log.run(stats.last_sequence)?;

        Ok(Replayed { store, log, stats })
    }
}

/// Apply every event until both streams close, failing on the first error
///
/// Returns only once the reader has dropped both senders, so no replay I/O
/// is still in flight when the caller goes live.
pub fn apply_all(
    store: &KeyValueStore,
    events: &Receiver<Event>,
    errors: &Receiver<LedgerError>,
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    loop {
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => {
                    store.apply(&event)?;
                    stats.record(&event);
                }
                // Events closed: the reader is done, a buffered error may remain
                Err(RecvError) => {
                    return match errors.recv() {
                        Ok(e) => Err(e),
                        Err(RecvError) => Ok(stats),
                    };
                }
            },
            recv(errors) -> msg => match msg {
                Ok(e) => return Err(e),
                // Errors closed cleanly: drain whatever events are still buffered
                Err(RecvError) => {
                    for event in events.iter() {
                        store.apply(&event)?;
                        stats.record(&event);
                    }
                    return Ok(stats);
                }
            },
        }
    }
}
