//! Serial Command Executor
//!
//! Exactly one task owns the [`CommandHandler`] (and through it the storage
//! engine). Everything else talks to it by message passing:
//!
//! ```text
//!  connection task ─┐
//!  connection task ─┼──> unbounded mpsc ──> event loop ──> CommandHandler
//!  sweeper task ────┘        (FIFO)          (one request       │
//!        ▲                                    at a time)        │
//!        └──────────────── oneshot reply ───────────────────────┘
//! ```
//!
//! The loop never awaits while a request is being executed, so the effects
//! of two requests can never interleave. Requests are applied in the order
//! they land in the channel.

use crate::commands::{Command, CommandHandler};
use crate::protocol::RespValue;
use crate::storage::{CleanupReport, StorageEngine, StorageStats};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

/// Raised when the event loop is no longer running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatcher is not running")]
    Closed,
}

/// A unit of work for the event loop, carrying its private reply slot.
#[derive(Debug)]
enum Request {
    Execute {
        command: Command,
        reply: oneshot::Sender<RespValue>,
    },
    CleanUp {
        reply: oneshot::Sender<CleanupReport>,
    },
    Stats {
        reply: oneshot::Sender<StorageStats>,
    },
}

/// Handle used to submit work to the event loop.
///
/// Cloning is cheap; every clone feeds the same queue. The loop stops once
/// all handles are dropped.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Request>,
}

impl Dispatcher {
    /// Spawns the event loop on the current Tokio runtime.
    ///
    /// The returned join handle completes once every `Dispatcher` clone has
    /// been dropped and the queue is drained.
    pub fn start(storage: StorageEngine) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_loop(CommandHandler::new(storage), rx));

        info!("Dispatcher started");
        (Self { tx }, handle)
    }

    /// Submits a command and waits for its reply.
    pub async fn submit(&self, command: Command) -> Result<RespValue, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Execute { command, reply })?;
        rx.await.map_err(|_| DispatchError::Closed)
    }

    /// Runs one active-expiration cycle on the event loop.
    pub async fn clean_up(&self) -> Result<CleanupReport, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::CleanUp { reply })?;
        rx.await.map_err(|_| DispatchError::Closed)
    }

    /// Reads storage statistics on the event loop.
    pub async fn stats(&self) -> Result<StorageStats, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Stats { reply })?;
        rx.await.map_err(|_| DispatchError::Closed)
    }

    fn send(&self, request: Request) -> Result<(), DispatchError> {
        self.tx.send(request).map_err(|_| DispatchError::Closed)
    }
}

/// The event loop. Processes one request to completion before taking the
/// next.
async fn run_loop(mut handler: CommandHandler, mut rx: mpsc::UnboundedReceiver<Request>) {
    while let Some(request) = rx.recv().await {
        // A dropped reply slot means the requester went away; nothing to do.
        match request {
            Request::Execute { command, reply } => {
                let response = handler.execute(command);
                let _ = reply.send(response);
            }
            Request::CleanUp { reply } => {
                let report = handler.cleanup();
                let _ = reply.send(report);
            }
            Request::Stats { reply } => {
                let _ = reply.send(handler.stats());
            }
        }
    }

    info!("Dispatcher stopped");
}
