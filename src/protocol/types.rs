//! RESP Data Types
//!
//! This module defines the subset of RESP values the server understands.
//! Every value starts with a type prefix byte and every line ends with CRLF.
//!
//! ## Protocol Format
//!
//! - `+` Simple String: `+OK\r\n`
//! - `-` Error: `-ERR unknown command 'FOO'\r\n`
//! - `:` Integer: `:1000\r\n`
//! - `$` Bulk String: `$5\r\nhello\r\n`
//! - `*` Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! - `_` Nil: `_\r\n`
//!
//! ## Error / Simple String asymmetry
//!
//! Errors are encoded with the `-` prefix, but the decoder reads a `-` line
//! back as a [`RespValue::SimpleString`]. Code that needs to tell a server
//! error apart from a status reply has to look at the prefix byte before
//! decoding. [`RespValue::output`] relies on this: a decoded error prints its
//! text like any other status line.

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
    pub const NIL: u8 = b'_';
}

/// Represents a value in the RESP protocol.
///
/// Used both for decoded client requests and for replies produced by the
/// command handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status line without CRLF inside.
    /// Format: `+<text>\r\n`
    SimpleString(Bytes),

    /// Error reply. Only ever produced locally; see the module docs.
    /// Format: `-<text>\r\n`
    Error(Bytes),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe string.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Absent value.
    /// Format: `_\r\n`
    Nil,

    /// Ordered sequence of values, possibly nested.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Creates a new simple string response.
    ///
    /// # Example
    /// ```
    /// use quillkv::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<Bytes>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error response.
    ///
    /// # Example
    /// ```
    /// use quillkv::protocol::types::RespValue;
    /// let err = RespValue::error("ERR syntax error");
    /// assert!(err.is_error());
    /// ```
    pub fn error(s: impl Into<Bytes>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new integer response.
    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new bulk string response.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a nil response.
    pub fn nil() -> Self {
        RespValue::Nil
    }

    /// Creates an array response.
    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Creates an array of bulk strings.
    pub fn bulk_array<I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        RespValue::Array(
            items
                .into_iter()
                .map(|item| RespValue::BulkString(item.into()))
                .collect(),
        )
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::simple_string("OK")
    }

    /// Common response for PING
    pub fn pong() -> Self {
        RespValue::simple_string("PONG")
    }

    /// Serializes the value to its wire representation.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(s) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(s);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Nil => {
                buf.push(prefix::NIL);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Returns the payload of a simple or bulk string.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RespValue::SimpleString(b) | RespValue::BulkString(b) => Some(b),
            _ => None,
        }
    }

    /// Attempts to extract the inner array.
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Text of a simple or bulk string, empty for every other kind.
    fn text(&self) -> String {
        self.as_bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// Renders the value for the interactive client.
    ///
    /// Arrays print one element per line, strings print their text and
    /// integers print in decimal. Anything else prints `(nil)`.
    pub fn output(&self) -> String {
        match self {
            RespValue::Array(values) => values
                .iter()
                .map(RespValue::text)
                .collect::<Vec<_>>()
                .join("\n"),
            RespValue::SimpleString(_) | RespValue::BulkString(_) => self.text(),
            RespValue::Integer(n) => n.to_string(),
            RespValue::Error(_) | RespValue::Nil => "(nil)".to_string(),
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s)),
            RespValue::Error(s) => write!(f, "(error) {}", String::from_utf8_lossy(s)),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            RespValue::Nil => write!(f, "(nil)"),
            RespValue::Array(values) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    writeln!(f)?;
                    for (i, v) in values.iter().enumerate() {
                        writeln!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
        }
    }
}
