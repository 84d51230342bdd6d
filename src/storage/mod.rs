//! Storage Module
//!
//! This module provides the core of stashkv: a thread-safe store mapping
//! top-level keys to nested JSON documents with per-key TTL expiration,
//! slash-path resolution into stored documents, and the request-driven
//! expiration sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   KeyStore                    │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │             RwLock<Inner>               │  │
//! │  │   values:      key -> JSON document     │  │
//! │  │   expirations: key -> created_at, ttl   │  │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//!                        ▲
//!                        │ snapshot / remove
//!          ┌─────────────┴──────────────┐
//!          │     ExpirationSweeper      │
//!          │  (runs after each request) │
//!          └────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use stashkv::storage::KeyStore;
//! use serde_json::json;
//!
//! let store = KeyStore::new();
//!
//! store.put("config", r#"{"retries": 3, "hosts": ["a", "b"]}"#, Some("30m")).unwrap();
//!
//! assert_eq!(store.get(&["config", "retries"]).unwrap(), json!(3));
//! assert_eq!(store.get(&["config", "hosts", "1"]).unwrap(), json!("a"));
//! ```

pub mod expiry;
pub mod path;
pub mod store;

// Re-export commonly used types
pub use expiry::{parse_ttl, Expiration, ExpirationSweeper, DEFAULT_TTL};
pub use store::{KeyStore, StoreError, StoreStats};
