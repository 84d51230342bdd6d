//! HTTP Request and Response Types
//!
//! This module defines the data types used by the HTTP/1.1 layer.
//! Only the small slice of HTTP that the store needs is modeled:
//! a method token, a request target, a handful of headers, and an
//! optional `Content-Length` body.
//!
//! ## Examples
//!
//! Request: `GET /db/users/alice HTTP/1.1\r\nHost: localhost\r\n\r\n`
//! Response: `HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n...`

use bytes::{Bytes, BytesMut};
use std::fmt;

/// The CRLF line terminator used by HTTP/1.1
pub const CRLF: &[u8] = b"\r\n";

/// HTTP method of an incoming request.
///
/// The store only acts on `GET`, `PUT` and `DELETE`; every other token is
/// carried as [`Method::Other`] so the router can answer it with a 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Delete,
    /// Any other method token (HEAD, POST, ...), kept for logging
    Other(String),
}

impl Method {
    /// Maps a request-line token to a method.
    pub fn from_token(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol version of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

/// A fully parsed HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Raw request target, e.g. `/db/users/alice?pretty=1`
    pub target: String,
    pub version: Version,
    /// Header name/value pairs in arrival order
    pub headers: Vec<(String, String)>,
    /// Request body (empty unless a `Content-Length` was supplied)
    pub body: Bytes,
}

impl HttpRequest {
    /// Looks up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path component of the target, without the query string.
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }

    /// Whether the connection should stay open after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive, HTTP/1.0 to close; an explicit
    /// `Connection` header wins either way.
    pub fn keep_alive(&self) -> bool {
        match self.header("connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version == Version::Http11,
        }
    }
}

/// An HTTP response ready to be serialized onto the wire.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub body: Bytes,
    /// Close the connection after sending (set by the connection layer)
    pub close: bool,
}

impl HttpResponse {
    /// A 200 response with a JSON body.
    ///
    /// Store-level errors are signaled inside the JSON envelope, so every
    /// `/db` reply travels as a 200.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type: "application/json",
            body: body.into(),
            close: false,
        }
    }

    /// The standard 404 response for everything outside `/db`.
    pub fn not_found() -> Self {
        Self {
            status: 404,
            reason: "Not Found",
            content_type: "text/plain; charset=utf-8",
            body: Bytes::from_static(b"404 page not found\n"),
            close: false,
        }
    }

    /// Sent once when the request bytes cannot be parsed; the connection
    /// closes afterwards.
    pub fn bad_request() -> Self {
        Self {
            status: 400,
            reason: "Bad Request",
            content_type: "text/plain; charset=utf-8",
            body: Bytes::from_static(b"400 bad request\n"),
            close: true,
        }
    }

    /// Serializes the status line, headers and body into wire bytes.
    pub fn serialize(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(128 + self.body.len());
        out.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", self.status, self.reason).as_bytes());
        out.extend_from_slice(format!("Content-Type: {}\r\n", self.content_type).as_bytes());
        out.extend_from_slice(format!("Content-Length: {}\r\n", self.body.len()).as_bytes());
        out.extend_from_slice(if self.close {
            b"Connection: close\r\n".as_slice()
        } else {
            b"Connection: keep-alive\r\n".as_slice()
        });
        out.extend_from_slice(CRLF);
        out.extend_from_slice(&self.body);
        out.freeze()
    }
}
