//! Connection Handler Module
//!
//! This module manages individual client connections. Each accepted TCP
//! connection is handled by its own async task, so many clients can be
//! served concurrently over one shared store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                      (main.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept(), spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │   Read bytes ──> Parse HTTP ──> Execute ──> Send response   │
//! │                                                  │          │
//! │                                                  ▼          │
//! │                                          Sweep expired keys │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Tokio for non-blocking network operations
//! - **Keep-Alive**: HTTP/1.1 persistent connections with pipelining
//! - **Timeouts**: per-read and per-response deadlines
//! - **Request-driven expiry**: the sweeper runs after every response
//! - **Statistics**: connection and request metrics

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
