//! Connection Handler Module
//!
//! This module handles individual client connections. Each client gets its
//! own handler task that runs in a loop, reading HTTP requests and sending
//! responses until the connection closes.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  Read bytes from socket      │
//!    │        │                     │
//!    │        ▼                     │
//!    │  Parse HTTP request          │
//!    │        │                     │
//!    │        ▼                     │
//!    │  Execute against the store   │
//!    │        │                     │
//!    │        ▼                     │
//!    │  Send response               │
//!    │        │                     │
//!    │        ▼                     │
//!    │  Sweep expired keys          │
//!    │        │                     │
//!    │        ▼                     │
//!    │   [Loop if keep-alive]       │
//!    └──────────────────────────────┘
//! ```
//!
//! The expiration sweep is piggybacked here, after each response: there is
//! no background timer, so eviction rides on request traffic.
//!
//! ## Buffer Management
//!
//! A `BytesMut` buffer accumulates incoming data. TCP is a stream
//! protocol - a read may deliver a partial request, or several pipelined
//! requests at once; the incremental parser consumes exactly one request
//! per iteration.

use crate::api::RequestHandler;
use crate::protocol::parser::{MAX_BODY_SIZE, MAX_HEAD_SIZE};
use crate::protocol::{HttpParser, HttpRequest, HttpResponse, ParseError};
use crate::storage::ExpirationSweeper;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

/// Largest amount of unparsed data buffered for one connection.
const MAX_BUFFER_SIZE: usize = MAX_HEAD_SIZE + MAX_BODY_SIZE;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests processed
    pub requests_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_processed(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Request parser
    parser: HttpParser,

    /// Routing and reply shaping (shares the store with all connections)
    handler: RequestHandler,

    /// Runs after every served request
    sweeper: ExpirationSweeper,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Per-read timeout
    read_timeout: Duration,

    /// Per-response timeout
    write_timeout: Duration,
}

impl ConnectionHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        handler: RequestHandler,
        sweeper: ExpirationSweeper,
        stats: Arc<ConnectionStats>,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: HttpParser::new(),
            handler,
            sweeper,
            stats,
            read_timeout,
            write_timeout,
        }
    }

    /// Runs the main connection loop.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "client connection closed"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "client disconnected")
                }
                ConnectionError::Io(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "connection reset by client")
                }
                ConnectionError::ReadTimeout => {
                    debug!(client = %self.addr, "idle connection timed out")
                }
                _ => warn!(client = %self.addr, error = %e, "connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The read-parse-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            loop {
                match self.parser.parse(&self.buffer) {
                    Ok(Some((request, consumed))) => {
                        let _ = self.buffer.split_to(consumed);
                        trace!(
                            client = %self.addr,
                            consumed,
                            remaining = self.buffer.len(),
                            "parsed request"
                        );
                        if self.serve(request).await? {
                            return Ok(());
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(client = %self.addr, error = %e, "malformed request");
                        let _ = self.send_response(&HttpResponse::bad_request()).await;
                        return Err(ConnectionError::Parse(e));
                    }
                }
            }

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Executes one request; returns true when the connection should close.
    async fn serve(&mut self, request: HttpRequest) -> Result<bool, ConnectionError> {
        let mut response = self.handler.execute(&request);
        response.close = !request.keep_alive();
        self.stats.request_processed();

        self.send_response(&response).await?;

        // Eviction rides on request traffic, not a timer
        self.sweeper.sweep().await;

        Ok(response.close)
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        let read = timeout(
            self.read_timeout,
            self.stream.get_mut().read_buf(&mut self.buffer),
        )
        .await;
        let n = match read {
            Ok(result) => result?,
            Err(_) => return Err(ConnectionError::ReadTimeout),
        };

        if n == 0 {
            // Connection closed by client
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            }
            // Partial request left in the buffer
            return Err(ConnectionError::UnexpectedEof);
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "read data");

        Ok(())
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &HttpResponse) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        let write_timeout = self.write_timeout;
        let write = async {
            self.stream.write_all(&bytes).await?;
            self.stream.flush().await
        };
        timeout(write_timeout, write)
            .await
            .map_err(|_| ConnectionError::WriteTimeout)??;

        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            status = response.status,
            bytes = bytes.len(),
            "sent response"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Client disconnected normally
    #[error("client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial request)
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("buffer size limit exceeded")]
    BufferFull,

    /// No request bytes arrived within the read timeout
    #[error("read timed out")]
    ReadTimeout,

    /// The response could not be written within the write timeout
    #[error("write timed out")]
    WriteTimeout,
}

/// Handles a client connection to completion.
///
/// This is a convenience function that creates a [`ConnectionHandler`]
/// and runs it, downgrading routine disconnects to debug logs.
#[allow(clippy::too_many_arguments)]
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handler: RequestHandler,
    sweeper: ExpirationSweeper,
    stats: Arc<ConnectionStats>,
    read_timeout: Duration,
    write_timeout: Duration,
) {
    let handler = ConnectionHandler::new(
        stream,
        addr,
        handler,
        sweeper,
        stats,
        read_timeout,
        write_timeout,
    );
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected | ConnectionError::ReadTimeout => {}
            ConnectionError::Io(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errlog::ErrorSink;
    use crate::storage::KeyStore;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    async fn create_test_server() -> (SocketAddr, Arc<KeyStore>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(KeyStore::new());
        let stats = Arc::new(ConnectionStats::new());
        let sink = ErrorSink::spawn(
            std::env::temp_dir().join(format!("stashkv-conn-test-{}.log", std::process::id())),
        );

        let store_clone = Arc::clone(&store);
        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = RequestHandler::new(Arc::clone(&store_clone), sink.clone());
                let sweeper = ExpirationSweeper::new(Arc::clone(&store_clone));
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    handler,
                    sweeper,
                    stats,
                    Duration::from_secs(10),
                    Duration::from_secs(10),
                ));
            }
        });

        (addr, store, stats)
    }

    /// Reads exactly one HTTP response (head + Content-Length body).
    async fn read_response(client: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut chunk = [0u8; 1];
        loop {
            if let Some(total) = expected_len(&data) {
                if data.len() >= total {
                    break;
                }
            }
            let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut chunk))
                .await
                .expect("response timed out")
                .unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn expected_len(data: &[u8]) -> Option<usize> {
        let head_end = data.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
        let head = std::str::from_utf8(&data[..head_end]).ok()?;
        for line in head.lines() {
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    return Some(head_end + value.trim().parse::<usize>().ok()?);
                }
            }
        }
        None
    }

    fn response_body(response: &str) -> Value {
        let body = response.split("\r\n\r\n").nth(1).unwrap();
        serde_json::from_str(body).unwrap()
    }

    fn put_request(key: &str, form: &str) -> String {
        format!(
            "PUT /db/{} HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            key,
            form.len(),
            form
        )
    }

    #[tokio::test]
    async fn test_put_then_get_over_http() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let put = put_request("user", "data=%7B%22name%22%3A%22Alice%22%7D&expiration=1h");
        client.write_all(put.as_bytes()).await.unwrap();
        let response = read_response(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(
            response_body(&response),
            json!({"error": false, "body": "Success on adding key user"})
        );

        client
            .write_all(b"GET /db/user/name HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut client).await;
        assert_eq!(
            response_body(&response),
            json!({"error": false, "body": "Alice"})
        );
    }

    #[tokio::test]
    async fn test_unknown_route_gets_404() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"GET /status HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 404 Not Found"));
        assert!(response.ends_with("404 page not found\n"));
    }

    #[tokio::test]
    async fn test_pipelined_requests() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let put = put_request("k", "data=%7B%22a%22%3A1%7D");
        client.write_all(put.as_bytes()).await.unwrap();
        read_response(&mut client).await;

        // Two GETs in a single write; both answered in order
        client
            .write_all(b"GET /db/k/a HTTP/1.1\r\n\r\nGET /db/missing HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let first = read_response(&mut client).await;
        assert_eq!(response_body(&first), json!({"error": false, "body": 1}));

        let second = read_response(&mut client).await;
        assert_eq!(
            response_body(&second),
            json!({"error": true, "code": 2, "message": "Not found path"})
        );
    }

    #[tokio::test]
    async fn test_expired_key_swept_by_unrelated_request() {
        let (addr, store, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        let put = put_request("shortlived", "data=%7B%22a%22%3A1%7D&expiration=10ms");
        client.write_all(put.as_bytes()).await.unwrap();
        read_response(&mut client).await;
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // This request never touches the key, but the post-request sweep
        // evicts it
        client
            .write_all(b"GET /db/unrelated HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        read_response(&mut client).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_http10_connection_closes_after_response() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"GET /db/missing HTTP/1.0\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut client).await;
        assert!(response.contains("Connection: close"));

        // Server closes its end; the next read returns EOF
        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("expected EOF")
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_malformed_request_gets_400() {
        let (addr, _, _) = create_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"NOT A VALID REQUEST LINE AT ALL\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut client).await;
        assert!(response.starts_with("HTTP/1.1 400 Bad Request"));
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client
            .write_all(b"GET /db/missing HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        read_response(&mut client).await;

        assert!(stats.requests_processed.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);

        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
