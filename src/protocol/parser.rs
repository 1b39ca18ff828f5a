//! Incremental RESP Decoder
//!
//! The decoder works on a byte buffer that may hold a partial frame, one
//! frame, or several pipelined frames. Each call returns one of:
//!
//! - `Ok(Some((value, consumed)))` - a complete value was decoded from the
//!   first `consumed` bytes
//! - `Ok(None)` - the frame is not complete yet, read more bytes and retry
//! - `Err(ParseError)` - the bytes can never form a valid frame
//!
//! A caller whose stream ends while `Ok(None)` is still being returned holds
//! a truncated frame; the connection layer reports that as its own error.
//!
//! ## Decoding rules
//!
//! - `-` lines decode to [`RespValue::SimpleString`], not [`RespValue::Error`]
//! - `:` lines whose payload is not a number decode to `Integer(0)`
//! - `_` lines decode to [`RespValue::Nil`]; any payload before CRLF is ignored
//! - negative bulk string lengths are rejected
//! - arrays decode recursively and the first failing element fails the array

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

/// Framing errors raised while decoding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// A length or count line is not a valid integer
    #[error("invalid length: {0:?}")]
    InvalidLength(String),

    /// Bulk string length is negative
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF after a bulk payload, nesting too deep)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The declared payload exceeds the allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// A RESP decoder.
///
/// # Example
///
/// ```
/// use quillkv::protocol::{RespParser, RespValue};
///
/// let mut parser = RespParser::new();
/// let buf = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let (value, consumed) = parser.parse(buf).unwrap().unwrap();
/// assert_eq!(consumed, buf.len());
/// assert_eq!(value, RespValue::bulk_array(["GET", "name"]));
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth (for array parsing)
    depth: usize,
}

impl RespParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Attempts to decode one value from the start of `buf`.
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::ProtocolError(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }

        match buf[0] {
            prefix::SIMPLE_STRING | prefix::ERROR => Ok(parse_line(buf)
                .map(|(line, consumed)| (RespValue::SimpleString(line), consumed))),
            prefix::INTEGER => Ok(parse_line(buf).map(|(line, consumed)| {
                let n = std::str::from_utf8(&line)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(0);
                (RespValue::Integer(n), consumed)
            })),
            prefix::NIL => Ok(parse_line(buf).map(|(_, consumed)| (RespValue::Nil, consumed))),
            prefix::BULK_STRING => self.parse_bulk_string(buf),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }

    /// Parses a bulk string: `$<length>\r\n<data>\r\n`
    fn parse_bulk_string(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        debug_assert!(buf[0] == prefix::BULK_STRING);

        let (length, header_len) = match parse_length(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if length < 0 {
            return Err(ParseError::InvalidBulkLength(length));
        }
        let length = length as usize;

        if length > MAX_BULK_SIZE {
            return Err(ParseError::MessageTooLarge {
                size: length,
                max: MAX_BULK_SIZE,
            });
        }

        let total_needed = header_len + length + 2;
        if buf.len() < total_needed {
            return Ok(None);
        }

        if &buf[header_len + length..total_needed] != CRLF {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }

        let data = Bytes::copy_from_slice(&buf[header_len..header_len + length]);
        Ok(Some((RespValue::BulkString(data), total_needed)))
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        debug_assert!(buf[0] == prefix::ARRAY);

        let (count, header_len) = match parse_length(buf)? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count < 0 {
            return Err(ParseError::InvalidArrayLength(count));
        }
        let count = count as usize;

        // The count is untrusted; every element needs at least three bytes.
        let mut elements = Vec::with_capacity(count.min(buf.len() / 3));
        let mut consumed = header_len;

        self.depth += 1;
        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, element_consumed)) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                None => {
                    self.depth -= 1;
                    return Ok(None);
                }
            }
        }
        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Reads the line after the prefix byte. Returns the payload and the number
/// of bytes the whole line occupies, or `None` until CRLF arrives.
fn parse_line(buf: &[u8]) -> Option<(Bytes, usize)> {
    find_crlf(&buf[1..]).map(|pos| (Bytes::copy_from_slice(&buf[1..1 + pos]), 1 + pos + 2))
}

/// Reads a `<prefix><integer>\r\n` header.
fn parse_length(buf: &[u8]) -> ParseResult<Option<(i64, usize)>> {
    let pos = match find_crlf(&buf[1..]) {
        Some(pos) => pos,
        None => return Ok(None),
    };

    let raw = &buf[1..1 + pos];
    let length = std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ParseError::InvalidLength(String::from_utf8_lossy(raw).into_owned()))?;

    Ok(Some((length, 1 + pos + 2)))
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single value from the start of `buf`.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

/// Decodes one value from the front of `buf` and advances past it.
///
/// Leaves `buf` untouched when the frame is incomplete or invalid.
pub fn decode(buf: &mut BytesMut) -> ParseResult<Option<RespValue>> {
    match parse_message(buf)? {
        Some((value, consumed)) => {
            buf.advance(consumed);
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Encodes a value into its wire representation.
pub fn encode(value: &RespValue) -> Vec<u8> {
    value.serialize()
}
