//! Event definitions
//!
//! Defines log records and their one-line textual encoding.

use crate::error::{LedgerError, Result};

/// Largest sequence number a log may hold (a signed 64-bit counter on disk)
pub const MAX_SEQUENCE: u64 = i64::MAX as u64;

/// Kind of mutation recorded by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    Delete = 1,
    Put = 2,
}

impl EventType {
    /// Numeric code written to the log file
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a numeric code read from the log file
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(EventType::Delete),
            2 => Some(EventType::Put),
            _ => None,
        }
    }
}

/// A single, immutable record in the transaction log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Sequence number - strictly increasing, starts at 1
    pub sequence: u64,

    /// The mutation this event records
    pub event_type: EventType,

    pub key: String,

    /// Empty for deletes
    pub value: String,
}

impl Event {
    /// Create a put event
    pub fn put(sequence: u64, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence,
            event_type: EventType::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a delete event
    pub fn delete(sequence: u64, key: impl Into<String>) -> Self {
        Self {
            sequence,
            event_type: EventType::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Encode as one log line, including the trailing newline
    pub fn encode(&self) -> String {
        encode_record(self.sequence, self.event_type, &self.key, &self.value)
    }

    /// Decode one log line (without its newline)
    ///
    /// `line_no` is only used to label parse errors.
    pub fn decode(line: &str, line_no: u64) -> Result<Self> {
        let parse_error = |reason: String| LedgerError::Parse {
            line: line_no,
            reason,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 || fields.len() > 4 {
            return Err(parse_error(format!(
                "expected 3 or 4 tab-separated fields, found {}",
                fields.len()
            )));
        }

        let sequence = fields[0]
            .parse::<u64>()
            .map_err(|e| parse_error(format!("invalid sequence {:?}: {}", fields[0], e)))?;
        if sequence > MAX_SEQUENCE {
            return Err(parse_error(format!(
                "sequence {} exceeds maximum {}",
                sequence, MAX_SEQUENCE
            )));
        }

        let event_type = fields[1]
            .parse::<u8>()
            .ok()
            .and_then(EventType::from_code)
            .ok_or_else(|| parse_error(format!("invalid event type {:?}", fields[1])))?;

        let key = unescape(fields[2]).map_err(&parse_error)?;
        let value = match (event_type, fields.get(3)) {
            (EventType::Put, Some(raw)) => unescape(raw).map_err(&parse_error)?,
            _ => String::new(),
        };

        Ok(Self {
            sequence,
            event_type,
            key,
            value,
        })
    }
}

/// Format one record line
pub(crate) fn encode_record(
    sequence: u64,
    event_type: EventType,
    key: &str,
    value: &str,
) -> String {
    format!(
        "{}\t{}\t{}\t{}\n",
        sequence,
        event_type.code(),
        escape(key),
        escape(value)
    )
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(field: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("invalid escape sequence \\{}", other)),
            None => return Err("dangling escape at end of field".to_string()),
        }
    }
    Ok(out)
}
