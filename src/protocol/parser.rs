//! Line-Oriented Request Parser
//!
//! This module implements the request side of the simplified dialect:
//! commands arrive as single text lines terminated by `\r\n` (or a bare
//! `\n`), and are tokenized on whitespace into a command name plus
//! arguments.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((line, consumed)))` - a complete line was framed, `consumed`
//!   bytes were used
//! - `Ok(None)` - no terminator yet, the line is incomplete
//! - `Err(ParseError)` - the line is malformed (bad UTF-8, unbalanced
//!   quotes)
//!
//! This design allows the caller to:
//! 1. Append incoming network data to a buffer
//! 2. Call `parse_line()` to attempt framing
//! 3. If successful, advance the buffer by `consumed` bytes
//! 4. If incomplete, wait for more data
//! 5. If error, reply with a syntax error and keep the connection open
//!
//! ## Quoting
//!
//! Arguments containing spaces may be wrapped in double quotes. The quote
//! characters are stripped and the interior is taken verbatim; there is no
//! escape processing. A line that ends inside an open quote is a syntax
//! error.

use crate::protocol::types::Request;
use thiserror::Error;

/// Errors produced while parsing a request line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The request line is not valid UTF-8
    #[error("invalid UTF-8 in request line")]
    InvalidUtf8,

    /// A double-quoted argument was never closed
    #[error("unbalanced quotes in request line")]
    UnbalancedQuote,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// One framed request line.
///
/// Blank lines are framed explicitly so the connection layer can consume
/// them without producing a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// The line contained nothing but whitespace
    Empty,
    /// A command with its arguments
    Request(Request),
}

/// Attempts to frame and tokenize one request line from the buffer.
///
/// # Returns
///
/// - `Ok(Some((line, consumed)))` - a full line was parsed
/// - `Ok(None)` - no line terminator in the buffer yet
/// - `Err(e)` - the line was complete but malformed; the caller should
///   still consume it (the error carries no length, so callers discard up
///   to and including the terminator found by `find_terminator`)
pub fn parse_line(buf: &[u8]) -> ParseResult<Option<(Line, usize)>> {
    let pos = match find_terminator(buf) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    // Consume through the `\n`; tolerate a `\r` right before it.
    let consumed = pos + 1;
    let mut line = &buf[..pos];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }

    let text = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;

    let tokens = tokenize(text)?;
    let mut iter = tokens.into_iter();
    match iter.next() {
        Some(name) => Ok(Some((
            Line::Request(Request::new(name, iter.collect())),
            consumed,
        ))),
        None => Ok(Some((Line::Empty, consumed))),
    }
}

/// Returns the position of the byte span a malformed line occupies, so the
/// connection layer can discard it and move on.
pub fn malformed_line_len(buf: &[u8]) -> usize {
    match find_terminator(buf) {
        Some(pos) => pos + 1,
        None => buf.len(),
    }
}

/// Finds the first `\n` in the buffer.
#[inline]
fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Splits a request line into whitespace-separated tokens, honoring
/// double quotes.
///
/// Quotes toggle a "verbatim" mode: whitespace inside quotes does not
/// split, and the quote characters themselves are dropped. A quoted empty
/// string (`""`) still produces a token.
fn tokenize(text: &str) -> ParseResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quoted = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() || quoted {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(ParseError::UnbalancedQuote);
    }
    if !current.is_empty() || quoted {
        tokens.push(current);
    }

    Ok(tokens)
}
