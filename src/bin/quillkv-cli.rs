//! Interactive client for QuillKV.
//!
//! ```text
//! $ quillkv-cli 127.0.0.1:6379
//! > SET name quill
//! OK
//! > GET name
//! quill
//! ```
//!
//! Each input line is split on whitespace and sent as an array of bulk
//! strings. Replies are printed in their human-readable form.

use anyhow::{bail, Context};
use bytes::BytesMut;
use quillkv::protocol::{decode, RespValue};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// A connection to the server that exchanges one request at a time.
struct Client {
    stream: TcpStream,
    buffer: BytesMut,
}

impl Client {
    async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("failed to connect to {}", addr))?;
        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
        })
    }

    async fn request<'a>(
        &mut self,
        words: impl IntoIterator<Item = &'a str>,
    ) -> anyhow::Result<RespValue> {
        let frame = RespValue::bulk_array(words.into_iter().map(|w| w.to_string()));
        self.stream.write_all(&frame.serialize()).await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> anyhow::Result<RespValue> {
        loop {
            if let Some(reply) = decode(&mut self.buffer).context("malformed reply")? {
                return Ok(reply);
            }
            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                bail!("server closed the connection");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{}:{}", quillkv::DEFAULT_HOST, quillkv::DEFAULT_PORT));

    let mut client = Client::connect(&addr).await?;

    let greeting = client.request(["PING"]).await?;
    if !greeting.output().starts_with("PONG") {
        bail!("unexpected reply to PING: {}", greeting);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nReceived Ctrl-C. Exiting...");
                return Ok(());
            }
        };

        let Some(line) = line else {
            println!();
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = client.request(line.split_whitespace()).await?;
        println!("{}", reply.output());
    }
}
