//! LedgerKV Server Binary
//!
//! Replays the transaction log, then serves clients over TCP.

use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam::channel;
use crossbeam::select;
use ledgerkv::network::Server;
use ledgerkv::{Config, Engine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// LedgerKV Server
#[derive(Parser, Debug)]
#[command(name = "ledgerkv-server")]
#[command(about = "Key-value store backed by a replayable transaction log")]
#[command(version)]
struct Args {
    /// Data directory (holds transaction.log)
    #[arg(short, long, default_value = "./ledgerkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Capacity of the transaction log submission queue
    #[arg(short, long, default_value = "16")]
    queue_capacity: usize,

    /// fsync after this many records (1 = every record)
    #[arg(short, long, default_value = "100")]
    sync_every: usize,
}

/// Why the server is stopping
enum Stop {
    Signal,
    PersistenceFailure(ledgerkv::LedgerError),
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ledgerkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("LedgerKV Server v{}", ledgerkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = if args.sync_every <= 1 {
        SyncStrategy::EveryWrite
    } else {
        SyncStrategy::EveryNEntries { count: args.sync_every }
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .queue_capacity(args.queue_capacity)
        .sync_strategy(sync_strategy)
        .build();

    // Replay must succeed before anything is served
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let stats = engine.replay_stats();
    tracing::info!(
        "Engine ready: {} events replayed, {} keys",
        stats.events_replayed,
        engine.len()
    );

    let mut server = Server::new(config, Arc::clone(&engine));
    let shutdown = server.shutdown_flag();

    let (signal_tx, signal_rx) = channel::bounded::<()>(1);
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(());
    }) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    // Watch for a shutdown signal or an asynchronous persistence failure
    let log_errors = engine.log_errors();
    let watcher = thread::spawn(move || {
        let stop = select! {
            recv(signal_rx) -> _ => Stop::Signal,
            recv(log_errors) -> msg => match msg {
                Ok(e) => Stop::PersistenceFailure(e),
                Err(_) => Stop::Signal,
            },
        };
        shutdown.store(true, std::sync::atomic::Ordering::Release);
        stop
    });

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        let _ = engine.close();
        std::process::exit(1);
    }

    let exit_code = match watcher.join() {
        Ok(Stop::Signal) => {
            tracing::info!("Received shutdown signal");
            0
        }
        Ok(Stop::PersistenceFailure(e)) => {
            tracing::error!("Transaction log failed, shutting down: {}", e);
            1
        }
        Err(_) => {
            tracing::error!("Shutdown watcher panicked");
            1
        }
    };

    tracing::info!("Closing transaction log (draining pending events)");
    if let Err(e) = engine.close() {
        tracing::error!("Failed to close transaction log: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
    std::process::exit(exit_code);
}
