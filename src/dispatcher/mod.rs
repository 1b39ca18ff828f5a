//! Dispatcher Module
//!
//! Serializes every storage operation through a single event loop.
//!
//! - `event_loop`: the queue, the loop task and the [`Dispatcher`] handle
//! - `sweeper`: periodic active-expiry requests fed into the same queue

pub mod event_loop;
pub mod sweeper;

pub use event_loop::{DispatchError, Dispatcher};
pub use sweeper::{ExpirySweeper, DEFAULT_CLEANUP_INTERVAL};
