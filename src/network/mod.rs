//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop (non-blocking accept, polled)
//! - One thread per connection, capped by `max_connections`
//! - Commands routed through Engine

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
