//! API Module
//!
//! This module implements the request-processing layer: it receives
//! parsed HTTP requests, executes them against the store, and shapes the
//! JSON reply envelope.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  HTTP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ RequestHandler  │  (this module)
//! │                 │
//! │  - Route        │
//! │  - Execute      │
//! │  - Envelope     │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    KeyStore     │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;
pub mod reply;

// Re-export the main request handler
pub use handler::RequestHandler;
pub use reply::Reply;
