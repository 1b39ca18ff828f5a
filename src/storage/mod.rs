//! Storage Engine Module
//!
//! The key space and everything it owns.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                StorageEngine                │
//! │                                             │
//! │  HashMap<key, Entry>    ExpiryCandidates    │
//! │   ├─ Payload::Str        (keys with a       │
//! │   └─ Payload::Sorted      deadline)         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - `engine`: key map, lazy expiry, active cleanup
//! - `expiry`: candidate set sampled by the cleanup pass, and its tuning
//! - `sorted`: the sorted collection stored under ZADD keys
//!
//! The engine is not thread-safe on purpose: it is owned by the
//! dispatcher's event loop and never shared.

pub mod engine;
pub mod expiry;
pub mod sorted;

pub use engine::{deadline_after, CleanupReport, Entry, Payload, StorageEngine, StorageStats};
pub use expiry::{ExpiryCandidates, ExpiryConfig};
pub use sorted::SortedCollection;
