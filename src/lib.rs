//! # QuillKV - A Small In-Memory Key-Value Server
//!
//! QuillKV speaks a subset of RESP over TCP: string get/set/delete, key
//! expiration, key enumeration and a sorted collection with rank queries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              QuillKV                                │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐     ┌──────────────────────┐    │
//! │  │ TCP Server  │───>│ Connection  │────>│      Dispatcher      │    │
//! │  │ (Listener)  │    │  Handler    │ mpsc│  (single event loop) │    │
//! │  └─────────────┘    └──────┬──────┘     └──────────┬───────────┘    │
//! │                            │                       │ owns           │
//! │                     ┌──────┴──────┐                ▼                │
//! │                     │ RESP codec  │     ┌──────────────────────┐    │
//! │                     └─────────────┘     │   CommandHandler     │    │
//! │                                         │   └─ StorageEngine   │    │
//! │  ┌──────────────────┐  cleanup request  │      ├─ key map      │    │
//! │  │  ExpirySweeper   │──────────────────>│      └─ candidates   │    │
//! │  │  (timer task)    │                   └──────────────────────┘    │
//! │  └──────────────────┘                                               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The storage engine has no locks. It is owned by the dispatcher's event
//! loop and every read, write and cleanup cycle reaches it through that
//! loop's queue, one request at a time.
//!
//! ## Quick Start
//!
//! ```ignore
//! use quillkv::connection::{handle_connection, ConnectionStats};
//! use quillkv::dispatcher::{Dispatcher, ExpirySweeper};
//! use quillkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (dispatcher, _event_loop) = Dispatcher::start(StorageEngine::new());
//!     let _sweeper = ExpirySweeper::start(dispatcher.clone(), Duration::from_millis(100));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         tokio::spawn(handle_connection(stream, addr, dispatcher.clone(), Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `SET key value [seconds]`
//! - `GET key`
//! - `DEL key [key ...]`
//! - `EXPIRE key seconds`
//! - `KEYS [pattern]` (the pattern is accepted but every live key is listed)
//! - `ZADD key score member [score member ...]`
//! - `ZRANGE key start stop [WITHSCORES]`
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP value model, incremental decoder and encoder
//! - [`storage`]: key map, lazy and sampled active expiry, sorted collection
//! - [`commands`]: request validation and execution
//! - [`dispatcher`]: the serial event loop and the expiry sweeper
//! - [`connection`]: per-client read/submit/write loop

pub mod commands;
pub mod connection;
pub mod dispatcher;
pub mod protocol;
pub mod storage;

pub use commands::{Command, CommandHandler};
pub use connection::{handle_connection, ConnectionStats};
pub use dispatcher::{Dispatcher, ExpirySweeper};
pub use protocol::{ParseError, RespParser, RespValue};
pub use storage::{ExpiryConfig, StorageEngine};

/// The default port QuillKV listens on
pub const DEFAULT_PORT: u16 = 6379;

/// The default host QuillKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of QuillKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
