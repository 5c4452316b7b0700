//! Response definitions
//!
//! Represents responses to clients and how engine results map onto them.

use crate::error::{LedgerError, Result};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value for GET, error message for ERROR)
    pub payload: Option<String>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<String>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.to_string()),
        }
    }

    /// Map an engine result onto a response
    ///
    /// `NoSuchKey` is an ordinary negative answer; every other error is
    /// reported as ERROR with its message.
    pub fn from_result(result: Result<Option<String>>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(LedgerError::NoSuchKey) => Self::not_found(),
            Err(e) => Self::error(&e.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}
