//! Connection Handler
//!
//! Each client gets its own handler task that runs in a loop, decoding
//! requests and writing back replies.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects
//!        │
//!        ▼
//! 2. ┌──────────────────────────────────┐
//!    │  Read bytes into the buffer      │◄─────────┐
//!    └───────────────┬──────────────────┘          │
//!                    ▼                             │
//!    ┌──────────────────────────────────┐          │
//!    │  Decode every complete frame:    │          │
//!    │   frame → Command                │          │
//!    │   submit to Dispatcher, await    │          │
//!    │   encode reply                   │          │
//!    └───────────────┬──────────────────┘          │
//!                    ▼                             │
//!    ┌──────────────────────────────────┐          │
//!    │  Flush replies                   │──────────┘
//!    └──────────────────────────────────┘
//!        │
//!        ▼
//! 3. End of stream, malformed input or I/O error: task ends
//! ```
//!
//! Replies to pipelined requests are written in request order and flushed
//! together once the buffer holds no further complete frame.

use crate::commands::Command;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::protocol::{ParseError, RespParser, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Upper bound on buffered, not yet decoded input (8 MiB)
pub const MAX_BUFFER_SIZE: usize = 8 * 1024 * 1024;

const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The peer closed the stream in the middle of a frame
    #[error("Stream closed with {0} bytes of an incomplete frame buffered")]
    Truncated(usize),

    #[error("Buffer size limit exceeded")]
    BufferFull,

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Handles a single client connection.
///
/// Generic over the byte stream so the loop can be driven by a TCP socket
/// or a scripted in-memory stream alike.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,
    addr: SocketAddr,
    buffer: BytesMut,
    parser: RespParser,
    dispatcher: Dispatcher,
    stats: Arc<ConnectionStats>,
    /// Encoded replies not yet handed to the writer
    out: Vec<u8>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        dispatcher: Dispatcher,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::new(),
            dispatcher,
            stats,
            out: Vec::with_capacity(256),
        }
    }

    /// Runs the connection until the peer goes away or an error occurs.
    ///
    /// A clean end of stream between frames yields `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection closed with error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(frame) = self.try_parse_frame()? {
                let reply = self.process(frame).await?;
                reply.serialize_into(&mut self.out);
            }

            if !self.out.is_empty() {
                self.flush_replies().await?;
            }

            if !self.read_more_data().await? {
                return if self.buffer.is_empty() {
                    Ok(())
                } else {
                    Err(ConnectionError::Truncated(self.buffer.len()))
                };
            }
        }
    }

    /// Turns one request frame into its reply.
    ///
    /// Malformed requests are answered locally; everything else goes through
    /// the dispatcher.
    async fn process(&mut self, frame: RespValue) -> Result<RespValue, ConnectionError> {
        self.stats.command_processed();

        match Command::from_frame(frame) {
            Ok(command) => {
                trace!(client = %self.addr, command = command.kind.name(), "Submitting command");
                Ok(self.dispatcher.submit(command).await?)
            }
            Err(e) => {
                debug!(client = %self.addr, error = %e, "Rejected request");
                Ok(e.into())
            }
        }
    }

    fn try_parse_frame(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((value, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed frame"
                );
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Malformed input");
                Err(ConnectionError::Parse(e))
            }
        }
    }

    /// Reads more input. Returns `false` at end of stream.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(false);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(true)
    }

    async fn flush_replies(&mut self) -> Result<(), ConnectionError> {
        self.stream.write_all(&self.out).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(self.out.len());
        trace!(client = %self.addr, bytes = self.out.len(), "Sent replies");
        self.out.clear();
        Ok(())
    }
}

/// Runs a [`ConnectionHandler`] to completion.
///
/// Errors have already been logged by the handler, so they are dropped here.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    dispatcher: Dispatcher,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, dispatcher, stats);
    let _ = handler.run().await;
}
