//! Incremental HTTP/1.1 Request Parser
//!
//! This module parses HTTP requests out of a raw byte buffer.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((request, consumed)))` - Successfully parsed a request, `consumed` bytes were used
//! - `Ok(None)` - Need more data, the request is incomplete
//! - `Err(ParseError)` - Invalid request data
//!
//! This design allows the caller to:
//! 1. Append incoming network data to a buffer
//! 2. Call `parse()` to attempt parsing
//! 3. If successful, advance the buffer by `consumed` bytes
//! 4. If incomplete, wait for more data
//! 5. If error, answer with a 400 and close the connection
//!
//! A request is complete once the head (request line + headers) is
//! terminated by an empty line and, when a `Content-Length` header is
//! present, that many body bytes have arrived. Chunked transfer encoding
//! is not supported.

use crate::protocol::types::{HttpRequest, Method, Version};
use bytes::Bytes;
use thiserror::Error;

/// Maximum size of the request head (request line + headers)
pub const MAX_HEAD_SIZE: usize = 8 * 1024;

/// Maximum size of a request body (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Errors that can occur during HTTP parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The head grew past [`MAX_HEAD_SIZE`] without terminating
    #[error("request head too large: {size} bytes (max: {max})")]
    HeadTooLarge { size: usize, max: usize },

    /// Declared Content-Length exceeds [`MAX_BODY_SIZE`]
    #[error("request body too large: {size} bytes (max: {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// The request head is not valid UTF-8
    #[error("request head is not valid UTF-8")]
    InvalidUtf8,

    /// The request line does not have the `METHOD target HTTP/x.y` shape
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// Anything other than HTTP/1.0 or HTTP/1.1
    #[error("unsupported protocol version: {0:?}")]
    UnsupportedVersion(String),

    /// A header line without a colon separator
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A Content-Length value that does not parse as an unsigned integer
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// Transfer-Encoding is not supported
    #[error("unsupported Transfer-Encoding: {0:?}")]
    UnsupportedTransferEncoding(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// An incremental HTTP/1.1 request parser.
///
/// # Example
///
/// ```
/// use stashkv::protocol::HttpParser;
///
/// let parser = HttpParser::new();
/// let buf = b"GET /db/users HTTP/1.1\r\nHost: localhost\r\n\r\n";
///
/// let (request, consumed) = parser.parse(buf).unwrap().unwrap();
/// assert_eq!(consumed, buf.len());
/// assert_eq!(request.target, "/db/users");
/// ```
#[derive(Debug, Default)]
pub struct HttpParser;

impl HttpParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self
    }

    /// Attempts to parse one complete request from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((request, consumed)))` - Successfully parsed a request
    /// - `Ok(None)` - Incomplete data, need more bytes
    /// - `Err(e)` - Parse error
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(HttpRequest, usize)>> {
        if buf.is_empty() {
            return Ok(None);
        }

        let Some(head_end) = find_head_end(buf) else {
            if buf.len() > MAX_HEAD_SIZE {
                return Err(ParseError::HeadTooLarge {
                    size: buf.len(),
                    max: MAX_HEAD_SIZE,
                });
            }
            return Ok(None);
        };
        if head_end > MAX_HEAD_SIZE {
            return Err(ParseError::HeadTooLarge {
                size: head_end,
                max: MAX_HEAD_SIZE,
            });
        }

        // The head is everything before the blank line
        let head =
            std::str::from_utf8(&buf[..head_end - 4]).map_err(|_| ParseError::InvalidUtf8)?;
        let mut lines = head.split("\r\n");

        let request_line = lines.next().unwrap_or("");
        let (method, target, version) = parse_request_line(request_line)?;

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ParseError::MalformedHeader(line.to_string()))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        if let Some((_, encoding)) = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("transfer-encoding"))
        {
            return Err(ParseError::UnsupportedTransferEncoding(encoding.clone()));
        }

        let content_length = match headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        {
            Some((_, v)) => v
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidContentLength(v.clone()))?,
            None => 0,
        };
        if content_length > MAX_BODY_SIZE {
            return Err(ParseError::BodyTooLarge {
                size: content_length,
                max: MAX_BODY_SIZE,
            });
        }

        let total = head_end + content_length;
        if buf.len() < total {
            // Body still in flight
            return Ok(None);
        }

        let request = HttpRequest {
            method,
            target,
            version,
            headers,
            body: Bytes::copy_from_slice(&buf[head_end..total]),
        };
        Ok(Some((request, total)))
    }
}

/// Returns the index just past the `\r\n\r\n` head terminator.
fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn parse_request_line(line: &str) -> ParseResult<(Method, String, Version)> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    };
    if parts.next().is_some() {
        return Err(ParseError::MalformedRequestLine(line.to_string()));
    }

    let version = match version {
        "HTTP/1.1" => Version::Http11,
        "HTTP/1.0" => Version::Http10,
        other => return Err(ParseError::UnsupportedVersion(other.to_string())),
    };

    Ok((Method::from_token(method), target.to_string(), version))
}
