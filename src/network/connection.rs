//! Connection Handler
//!
//! Serves one client: read a command, run it through the engine, reply.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{LedgerError, Result};
use crate::protocol::{read_command, write_response, Command, Response};

/// Handles a single client connection
pub struct Connection {
    reader: BufReader<TcpStream>,

    writer: BufWriter<TcpStream>,

    /// Shared engine; the connection never owns store or log directly
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

/// Errors that just mean the client went away (or idled past the timeout)
fn is_disconnect(err: &LedgerError) -> bool {
    match err {
        LedgerError::Io(e) => matches!(
            e.kind(),
            ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::WouldBlock
                | ErrorKind::TimedOut
        ),
        _ => false,
    }
}

impl Connection {
    /// Wrap an accepted stream with buffered reader/writer halves
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;
        let read_half = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(stream),
            engine,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 disables a timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let as_timeout = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        self.reader.get_ref().set_read_timeout(as_timeout(read_ms))?;
        self.writer.get_ref().set_write_timeout(as_timeout(write_ms))?;
        Ok(())
    }

    /// Serve commands until the client disconnects
    ///
    /// Disconnects and idle timeouts end the loop with `Ok`; a malformed
    /// request gets an ERROR response and ends it with the error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(command) => command,
                Err(e) if is_disconnect(&e) => {
                    tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                    let _ = write_response(&mut self.writer, &Response::error(&e.to_string()));
                    return Err(e);
                }
            };

            tracing::trace!("Received {} from {}", command.name(), self.peer_addr);
            let response = self.execute_command(command);

            match write_response(&mut self.writer, &response) {
                Ok(()) => {}
                Err(e) if is_disconnect(&e) => {
                    tracing::debug!(
                        "Client {} left before the response was sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            }
        }
    }

    /// Map an engine result onto a wire response
    fn execute_command(&self, command: Command) -> Response {
        let name = command.name();
        let result = self.engine.execute(command);
        if let Err(e) = &result {
            if !matches!(e, LedgerError::NoSuchKey) {
                tracing::warn!("{} from {} failed: {}", name, self.peer_addr, e);
            }
        }
        Response::from_result(result)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
