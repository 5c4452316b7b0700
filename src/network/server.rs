//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::Connection;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{LedgerError, Result};
use crate::protocol::{write_response, Response};

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for LedgerKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the listen address without serving yet
    ///
    /// Returns the bound address (useful with port 0).
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            LedgerError::Network(format!("cannot bind {}: {}", self.config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Serve connections until [`Server::shutdown`] is called (blocking)
    pub fn run(&mut self) -> Result<()> {
        let addr = self.bind()?;
        tracing::info!("Listening on {}", addr);

        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| LedgerError::Network("listener not bound".to_string()))?;

        while !self.shutdown.load(Ordering::Acquire) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = self.dispatch(stream) {
                        tracing::warn!("Failed to start connection from {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!(
            active = self.active_connections.load(Ordering::Acquire),
            "Server stopped accepting connections"
        );
        Ok(())
    }

    /// Spawn a handler thread for an accepted stream
    fn dispatch(&self, stream: TcpStream) -> Result<()> {
        stream.set_nonblocking(false)?;

        let active = self.active_connections.fetch_add(1, Ordering::AcqRel);
        if active >= self.config.max_connections {
            self.active_connections.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!("Rejecting connection: {} already open", active);
            let mut stream = stream;
            let _ = write_response(&mut stream, &Response::error("too many connections"));
            return Ok(());
        }

        let prepared = Connection::new(stream, Arc::clone(&self.engine)).and_then(|mut connection| {
            connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;
            Ok(connection)
        });
        let mut connection = match prepared {
            Ok(connection) => connection,
            Err(e) => {
                self.active_connections.fetch_sub(1, Ordering::AcqRel);
                return Err(e);
            }
        };

        let counter = Arc::clone(&self.active_connections);
        let spawned = thread::Builder::new()
            .name("ledgerkv-conn".to_string())
            .spawn(move || {
                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
                counter.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            self.active_connections.fetch_sub(1, Ordering::AcqRel);
            return Err(LedgerError::Io(e));
        }
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Flag that stops the accept loop when set; shareable across threads
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Acquire)
    }
}
