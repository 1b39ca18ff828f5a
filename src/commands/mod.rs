//! Command Module
//!
//! Turns decoded requests into storage engine calls.
//!
//! ```text
//! Request frame
//!       │
//!       ▼
//! ┌─────────────────┐
//! │    Command      │  (verb → CommandKind, args)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  validate, execute, build reply
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │
//! └─────────────────┘
//! ```
//!
//! Supported verbs: `PING`, `SET`, `GET`, `DEL`, `EXPIRE`, `KEYS`, `ZADD`,
//! `ZRANGE`, all case-insensitive.

pub mod command;
pub mod handler;

pub use command::{Command, CommandError, CommandKind};
pub use handler::CommandHandler;
