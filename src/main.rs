//! stashkv - An Ephemeral HTTP JSON Key-Value Store
//!
//! This is the main entry point for the stashkv server. It sets up the
//! TCP listener, the shared store, the error log sink, and handles
//! incoming connections.

use stashkv::api::RequestHandler;
use stashkv::connection::{handle_connection, ConnectionStats};
use stashkv::errlog::{ErrorSink, DEFAULT_ERROR_LOG};
use stashkv::storage::{ExpirationSweeper, KeyStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Error log file path
    error_log: String,
    /// Per-read socket timeout
    read_timeout: Duration,
    /// Per-response socket timeout
    write_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: stashkv::DEFAULT_HOST.to_string(),
            port: stashkv::DEFAULT_PORT,
            error_log: DEFAULT_ERROR_LOG.to_string(),
            read_timeout: stashkv::DEFAULT_READ_TIMEOUT,
            write_timeout: stashkv::DEFAULT_WRITE_TIMEOUT,
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
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--error-log" => {
                    if i + 1 < args.len() {
                        config.error_log = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --error-log requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("stashkv version {}", stashkv::VERSION);
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

fn print_help() {
    println!(
        r#"
stashkv - An Ephemeral HTTP JSON Key-Value Store

USAGE:
    stashkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>        Port to listen on (default: 8000)
        --error-log <FILE>   Error log file (default: error.log)
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    stashkv                        # Start on 127.0.0.1:8000
    stashkv --port 8080            # Start on port 8080
    stashkv --host 0.0.0.0         # Listen on all interfaces

USING IT:
    $ curl -X PUT http://127.0.0.1:8000/db/user \
        -d 'data={{"name":"Alice","tags":["a","b"]}}' -d 'expiration=30m'
    $ curl http://127.0.0.1:8000/db/user/tags/2
    $ curl -X DELETE http://127.0.0.1:8000/db/user
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // The store shared across all connections
    let store = Arc::new(KeyStore::new());
    info!("key store initialized");

    // Error replies are appended here by a dedicated task
    let sink = ErrorSink::spawn(config.error_log.clone());
    info!(path = %config.error_log, "error log sink started");

    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener; failing here is the only fatal error
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("listening on {}", config.bind_address());
    println!(
        "stashkv v{} - now you can visit http://{}",
        stashkv::VERSION,
        config.bind_address()
    );

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, store, sink, stats, &config) => {}
        _ = shutdown => {}
    }

    info!("server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    store: Arc<KeyStore>,
    sink: ErrorSink,
    stats: Arc<ConnectionStats>,
    config: &Config,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = RequestHandler::new(Arc::clone(&store), sink.clone());
                let sweeper = ExpirationSweeper::new(Arc::clone(&store));
                let stats = Arc::clone(&stats);
                let read_timeout = config.read_timeout;
                let write_timeout = config.write_timeout;

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(
                        stream,
                        addr,
                        handler,
                        sweeper,
                        stats,
                        read_timeout,
                        write_timeout,
                    )
                    .await;
                });
            }
            Err(e) => {
                error!("failed to accept connection: {}", e);
            }
        }
    }
}
