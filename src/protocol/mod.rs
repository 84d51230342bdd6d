//! HTTP/1.1 Protocol Implementation
//!
//! This module provides the small HTTP surface the store speaks: an
//! incremental request parser, request/response types, and form-encoded
//! body decoding.
//!
//! ## Modules
//!
//! - `types`: `Method`, `HttpRequest`, `HttpResponse` and serialization
//! - `parser`: incremental parser for incoming request bytes
//! - `form`: `application/x-www-form-urlencoded` body decoding
//!
//! ## Example
//!
//! ```
//! use stashkv::protocol::{HttpParser, HttpResponse};
//!
//! // Parsing incoming data
//! let data = b"GET /db/users HTTP/1.1\r\n\r\n";
//! let (request, consumed) = HttpParser::new().parse(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! // Creating responses
//! let response = HttpResponse::json(r#"{"error":false,"body":"ok"}"#);
//! let bytes = response.serialize();
//! ```

pub mod form;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{HttpParser, ParseError, ParseResult};
pub use types::{HttpRequest, HttpResponse, Method, Version};
