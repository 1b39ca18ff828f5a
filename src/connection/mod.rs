//! Connection Handler Module
//!
//! Manages individual client connections. Each accepted socket is handled by
//! its own async task; all of them feed the same dispatcher.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              TCP Listener (main.rs)           │
//! └──────────────────────┬────────────────────────┘
//!                        │ accept(), spawn task
//!                        ▼
//! ┌───────────────────────────────────────────────┐
//! │               ConnectionHandler               │
//! │                                               │
//! │  read bytes ─> decode frame ─> Command        │
//! │                                   │           │
//! │                                   ▼           │
//! │  write reply <─ encode <─ Dispatcher::submit  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use quillkv::connection::{handle_connection, ConnectionStats};
//! use quillkv::dispatcher::Dispatcher;
//! use quillkv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let (dispatcher, _event_loop) = Dispatcher::start(StorageEngine::new());
//! let stats = Arc::new(ConnectionStats::new());
//!
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, dispatcher.clone(), stats));
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, MAX_BUFFER_SIZE,
};
