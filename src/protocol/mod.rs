//! Simplified RESP Wire Codec
//!
//! This module implements both directions of the wire protocol: framing
//! and tokenizing incoming command lines, and serializing reply frames.
//!
//! ## Overview
//!
//! Requests are single text lines (`SET name value\r\n`); replies use a
//! small subset of RESP (`+`, `-`, `:`, `$-1`, and arrays of simple
//! strings). There is no bulk-string request framing.
//!
//! ## Modules
//!
//! - `types`: the `Request` and `Reply` types and reply serialization
//! - `parser`: incremental line framing and tokenization
//!
//! ## Example
//!
//! ```
//! use flintkv::protocol::{parse_line, Line, Reply};
//!
//! let (line, consumed) = parse_line(b"PING\r\n").unwrap().unwrap();
//! assert!(matches!(line, Line::Request(_)));
//! assert_eq!(consumed, 6);
//!
//! let reply = Reply::pong();
//! assert_eq!(reply.serialize(), b"+PONG\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{malformed_line_len, parse_line, Line, ParseError, ParseResult};
pub use types::{Reply, Request};
