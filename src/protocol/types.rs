//! Wire Types for the Simplified RESP Dialect
//!
//! This module defines the request and reply types exchanged with clients.
//! Requests arrive as single text lines; replies are encoded as a small
//! subset of RESP.
//!
//! ## Reply Format
//!
//! Each reply starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$-1` Null Bulk (the only bulk form used)
//! - `*` Array of simple strings
//!
//! All lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command 'FOO'\r\n`
//! Integer: `:1000\r\n`
//! Null Bulk: `$-1\r\n`
//! Array: `*2\r\n+a\r\n+b\r\n`

use std::fmt;

/// The CRLF terminator used for every reply line
pub const CRLF: &[u8] = b"\r\n";

/// Reply type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A parsed client request: a command name plus its arguments.
///
/// The name is kept exactly as the client sent it; the dispatcher
/// uppercases it during lookup since command names are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The command name, verbatim from the wire
    pub name: String,
    /// Positional arguments, quotes already stripped
    pub args: Vec<String>,
}

impl Request {
    /// Creates a request from a name and argument list.
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// A reply frame in the simplified RESP dialect.
///
/// This enum covers every reply shape the server produces. Arrays carry
/// plain strings because the dialect only ever encodes arrays of simple
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Non-binary text, no embedded CR/LF.
    /// Format: `+<text>\r\n`
    Simple(String),

    /// An error condition reported to the client.
    /// Format: `-<message>\r\n`
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<decimal>\r\n`
    Integer(i64),

    /// The "no value" marker.
    /// Format: `$-1\r\n`
    NullBulk,

    /// An array of simple strings.
    /// Format: `*<n>\r\n` followed by `n` simple-string lines
    Array(Vec<String>),
}

impl Reply {
    /// Creates a simple-string reply.
    pub fn simple(s: impl Into<String>) -> Self {
        Reply::Simple(s.into())
    }

    /// Creates an error reply.
    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    /// Creates an integer reply.
    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    /// Creates the null-bulk reply.
    pub fn null() -> Self {
        Reply::NullBulk
    }

    /// Creates an array reply.
    pub fn array(items: Vec<String>) -> Self {
        Reply::Array(items)
    }

    /// The canonical `+OK` reply.
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// The canonical `+PONG` reply.
    pub fn pong() -> Self {
        Reply::Simple("PONG".to_string())
    }

    /// Returns true if this reply is an error frame.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    ///
    /// More efficient than `serialize()` when a buffer is being reused.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::NullBulk => {
                buf.push(prefix::BULK);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Array(items) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for item in items {
                    buf.push(prefix::SIMPLE_STRING);
                    buf.extend_from_slice(item.as_bytes());
                    buf.extend_from_slice(CRLF);
                }
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Simple(s) => write!(f, "\"{}\"", s),
            Reply::Error(s) => write!(f, "(error) {}", s),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::NullBulk => write!(f, "(nil)"),
            Reply::Array(items) => {
                if items.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            writeln!(f)?;
                        }
                        write!(f, "{}) \"{}\"", i + 1, item)?;
                    }
                    Ok(())
                }
            }
        }
    }
}
