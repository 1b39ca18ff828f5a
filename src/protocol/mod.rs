//! RESP Protocol Subset
//!
//! The wire codec: decodes bytes into [`RespValue`] trees and encodes them
//! back. It knows nothing about commands.
//!
//! ## Modules
//!
//! - `types`: the `RespValue` enum, serialization and client-side rendering
//! - `parser`: incremental decoder and framing errors
//!
//! ## Example
//!
//! ```
//! use quillkv::protocol::{parse_message, RespValue};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! let reply = RespValue::bulk_string("quill");
//! assert_eq!(reply.serialize(), b"$5\r\nquill\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{decode, encode, parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
