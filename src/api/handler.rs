//! Request Handler Module
//!
//! This module implements the routing layer: it receives parsed HTTP
//! requests, maps them onto store operations, and shapes the JSON reply
//! envelope.
//!
//! ## Routing
//!
//! Only `/db/<key>[/<segment>...]` is served:
//! - `GET` resolves the path into the stored document
//! - `PUT` writes the `data` form field under the key, with an optional
//!   `expiration` duration
//! - `DELETE` removes the key (single-segment paths only)
//!
//! Everything else - other prefixes, `/db` without a key, other methods -
//! gets the standard 404. Store errors travel as 200s with an error
//! envelope, and their message is also forwarded to the error sink.

use crate::api::reply::Reply;
use crate::errlog::ErrorSink;
use crate::protocol::form;
use crate::protocol::types::{HttpRequest, HttpResponse, Method};
use crate::storage::store::{KeyStore, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Routes parsed HTTP requests to store operations.
///
/// Cheap to clone: one per connection, all sharing the same store and
/// error sink.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    store: Arc<KeyStore>,
    errors: ErrorSink,
}

impl RequestHandler {
    pub fn new(store: Arc<KeyStore>, errors: ErrorSink) -> Self {
        Self { store, errors }
    }

    /// Executes one request and produces the response to send back.
    pub fn execute(&self, request: &HttpRequest) -> HttpResponse {
        let path = request.path();
        let Some(raw) = path.strip_prefix("/db/") else {
            debug!(method = %request.method, path, "no route");
            return HttpResponse::not_found();
        };

        let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return HttpResponse::not_found();
        }

        let reply = match &request.method {
            Method::Get => self.get(&segments),
            Method::Put => self.put(&segments, &request.body),
            Method::Delete => self.delete(&segments),
            Method::Other(_) => {
                debug!(method = %request.method, path, "unsupported method");
                return HttpResponse::not_found();
            }
        };

        HttpResponse::json(reply.to_bytes())
    }

    fn get(&self, segments: &[&str]) -> Reply {
        match self.store.get(segments) {
            Ok(value) => Reply::success(value),
            Err(e) => self.failure(e),
        }
    }

    fn put(&self, segments: &[&str], body: &[u8]) -> Reply {
        let fields = form::parse(body);
        let data = form::value(&fields, "data").unwrap_or("");
        let expiration = form::value(&fields, "expiration");

        match self.store.put(segments[0], data, expiration) {
            Ok(()) => Reply::success(format!("Success on adding key {}", segments[0])),
            Err(e) => self.failure(e),
        }
    }

    fn delete(&self, segments: &[&str]) -> Reply {
        match self.store.delete(segments) {
            Ok(()) => Reply::success(format!("Success on removing the key {}", segments[0])),
            Err(e) => self.failure(e),
        }
    }

    /// Shapes the error envelope and forwards the message to the log sink.
    fn failure(&self, error: StoreError) -> Reply {
        let message = error.to_string();
        self.errors.report(&message);
        Reply::failure(error.code(), message)
    }
}
