//! # stashkv - An Ephemeral HTTP JSON Key-Value Store
//!
//! stashkv is an in-memory key-value store addressed over HTTP. Values are
//! nested JSON documents, looked up with slash-delimited paths, and every
//! key carries a TTL after which it expires. It is built for quick ad-hoc
//! data sharing between processes, not for durable storage: nothing
//! survives a restart.
//!
//! ## Features
//!
//! - **Nested JSON values**: `GET /db/user/address/city` walks into the
//!   stored document; numeric segments index lists 1-based
//! - **TTL expiration**: every key expires; the default lifetime is 2 hours
//! - **Request-driven sweeping**: expired keys are evicted after each
//!   served request - no background timer
//! - **Async I/O**: built on Tokio, one task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                              stashkv                               │
//! │                                                                    │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐             │
//! │  │ TCP Server  │───>│ Connection  │───>│  Request    │             │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │             │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘             │
//! │                                               │                    │
//! │                                               ▼                    │
//! │  ┌─────────────┐    ┌───────────────────────────────────────────┐  │
//! │  │   HTTP      │    │                KeyStore                   │  │
//! │  │   Parser    │    │      RwLock< values ∥ expirations >       │  │
//! │  └─────────────┘    └───────────────────────────────────────────┘  │
//! │                                               ▲                    │
//! │                     ┌─────────────────────────┴─────────────────┐  │
//! │                     │            ExpirationSweeper              │  │
//! │                     │        (runs after each request)          │  │
//! │                     └───────────────────────────────────────────┘  │
//! │                                                                    │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │  ErrorSink: bounded queue -> consumer task -> error.log     │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## HTTP Surface
//!
//! - `PUT /db/<key>` with form fields `data` (a JSON object) and optional
//!   `expiration` (a duration string such as `2h30m`)
//! - `GET /db/<key>[/<segment>...]`
//! - `DELETE /db/<key>`
//!
//! Every `/db` reply is a JSON envelope: `{"error":false,"body":...}` on
//! success, `{"error":true,"code":N,"message":"..."}` on failure. Paths
//! outside `/db` get a plain 404.
//!
//! ## Quick Start
//!
//! ```ignore
//! use stashkv::api::RequestHandler;
//! use stashkv::connection::{handle_connection, ConnectionStats};
//! use stashkv::errlog::ErrorSink;
//! use stashkv::storage::{ExpirationSweeper, KeyStore};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(KeyStore::new());
//!     let sink = ErrorSink::spawn(stashkv::errlog::DEFAULT_ERROR_LOG);
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:8000").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = RequestHandler::new(Arc::clone(&store), sink.clone());
//!         let sweeper = ExpirationSweeper::new(Arc::clone(&store));
//!
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             handler,
//!             sweeper,
//!             Arc::clone(&stats),
//!             stashkv::DEFAULT_READ_TIMEOUT,
//!             stashkv::DEFAULT_WRITE_TIMEOUT,
//!         ));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: incremental HTTP/1.1 parser, response types, form decoding
//! - [`storage`]: the key store, path resolution and the expiration sweeper
//! - [`api`]: request routing and the JSON reply envelope
//! - [`connection`]: per-client connection management
//! - [`errlog`]: asynchronous error log sink

pub mod api;
pub mod connection;
pub mod errlog;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use api::RequestHandler;
pub use connection::{handle_connection, ConnectionError, ConnectionStats};
pub use errlog::ErrorSink;
pub use protocol::{HttpParser, HttpRequest, HttpResponse, ParseError};
pub use storage::{ExpirationSweeper, KeyStore, StoreError, DEFAULT_TTL};

use std::time::Duration;

/// The default port stashkv listens on
pub const DEFAULT_PORT: u16 = 8000;

/// The default host stashkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default per-read socket timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-response socket timeout
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Version of stashkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
