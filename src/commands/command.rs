//! Command Representation
//!
//! A request frame is flattened into a [`Command`]: the verb resolved to a
//! [`CommandKind`] plus its arguments as byte strings.

use crate::protocol::RespValue;
use bytes::Bytes;
use thiserror::Error;

/// The verbs the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Ping,
    Set,
    Get,
    Del,
    Expire,
    Keys,
    ZAdd,
    ZRange,
}

impl CommandKind {
    /// Resolves a verb, ignoring ASCII case.
    pub fn from_verb(verb: &str) -> Option<Self> {
        let kind = match verb.to_ascii_lowercase().as_str() {
            "ping" => CommandKind::Ping,
            "set" => CommandKind::Set,
            "get" => CommandKind::Get,
            "del" => CommandKind::Del,
            "expire" => CommandKind::Expire,
            "keys" => CommandKind::Keys,
            "zadd" => CommandKind::ZAdd,
            "zrange" => CommandKind::ZRange,
            _ => return None,
        };
        Some(kind)
    }

    /// Lowercase verb, as used in error replies.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Ping => "ping",
            CommandKind::Set => "set",
            CommandKind::Get => "get",
            CommandKind::Del => "del",
            CommandKind::Expire => "expire",
            CommandKind::Keys => "keys",
            CommandKind::ZAdd => "zadd",
            CommandKind::ZRange => "zrange",
        }
    }
}

/// Errors returned to the client as `-` replies. None of them closes the
/// connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR empty command")]
    Empty,

    #[error("ERR invalid command format")]
    InvalidFormat,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    #[error("ERR syntax error")]
    Syntax,
}

impl From<CommandError> for RespValue {
    fn from(err: CommandError) -> Self {
        RespValue::error(err.to_string())
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    /// Arguments after the verb
    pub args: Vec<Bytes>,
}

impl Command {
    pub fn new(kind: CommandKind, args: Vec<Bytes>) -> Self {
        Self { kind, args }
    }

    /// Builds a command from a request frame.
    ///
    /// The frame must be an array. Its elements are flattened to byte
    /// strings: simple and bulk strings keep their payload, integers become
    /// their decimal text and anything else becomes empty.
    pub fn from_frame(frame: RespValue) -> Result<Self, CommandError> {
        let elements = frame.into_array().ok_or(CommandError::InvalidFormat)?;

        let mut parts = elements.into_iter().map(flatten);
        let verb = parts.next().ok_or(CommandError::Empty)?;
        let verb = String::from_utf8_lossy(&verb).into_owned();

        let kind = CommandKind::from_verb(&verb).ok_or(CommandError::Unknown(verb))?;
        Ok(Self::new(kind, parts.collect()))
    }
}

fn flatten(value: RespValue) -> Bytes {
    match value {
        RespValue::SimpleString(b) | RespValue::BulkString(b) => b,
        RespValue::Integer(n) => Bytes::from(n.to_string()),
        _ => Bytes::new(),
    }
}
