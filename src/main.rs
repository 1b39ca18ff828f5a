//! QuillKV server entry point.
//!
//! Sets up logging, the dispatcher, the expiry sweeper and the TCP listener,
//! then accepts connections until Ctrl+C.

use anyhow::Context;
use quillkv::connection::{handle_connection, ConnectionStats};
use quillkv::dispatcher::{Dispatcher, ExpirySweeper, DEFAULT_CLEANUP_INTERVAL};
use quillkv::storage::StorageEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Period of the active-expiry sweeper
    cleanup_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: quillkv::DEFAULT_HOST.to_string(),
            port: quillkv::DEFAULT_PORT,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    config.host = flag_value(&args, i, "--host").to_string();
                    i += 2;
                }
                "--port" | "-p" => {
                    config.port = flag_value(&args, i, "--port").parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--cleanup-interval" => {
                    let millis: u64 = flag_value(&args, i, "--cleanup-interval")
                        .parse()
                        .ok()
                        .filter(|ms| *ms > 0)
                        .unwrap_or_else(|| {
                            eprintln!("Error: --cleanup-interval must be a positive number of milliseconds");
                            std::process::exit(1);
                        });
                    config.cleanup_interval = Duration::from_millis(millis);
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("QuillKV version {}", quillkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Returns the value following the flag at `i`, or exits.
fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!(
        r#"
QuillKV - A Small In-Memory Key-Value Server

USAGE:
    quillkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>              Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>              Port to listen on (default: 6379)
        --cleanup-interval <MS>    Active expiry period in ms (default: 100)
    -v, --version                  Print version information
        --help                     Print this help message

LOGGING:
    Set RUST_LOG to adjust verbosity, e.g. RUST_LOG=quillkv=debug

CONNECTING:
    $ quillkv-cli 127.0.0.1:6379
    > SET name quill
    OK
    > GET name
    quill
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!(version = quillkv::VERSION, "Starting QuillKV");

    let (dispatcher, _event_loop) = Dispatcher::start(StorageEngine::new());
    let sweeper = ExpirySweeper::start(dispatcher.clone(), config.cleanup_interval);

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .inspect_err(|e| error!(address = %config.bind_address(), error = %e, "Failed to bind"))
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                // Without a signal handler the server runs until killed.
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = accept_loop(listener, dispatcher, Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    sweeper.stop();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, dispatcher: Dispatcher, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    warn!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                }
                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    dispatcher.clone(),
                    Arc::clone(&stats),
                ));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
