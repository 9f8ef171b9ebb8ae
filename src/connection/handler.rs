//! Per-Connection Read Loop
//!
//! Each client connection is served by one task running this loop:
//!
//! ```text
//! 1. Read bytes from the socket into a BytesMut buffer
//! 2. Frame one line (partial lines stay buffered across reads)
//! 3. Empty line -> discard, no reply
//! 4. Malformed line -> syntax-error reply, connection stays open
//! 5. Dispatch the command, serialize the reply, write, flush
//! 6. Loop until peer close, I/O error, or the shutdown signal
//! ```
//!
//! TCP is a stream: a single read may contain half a command or several
//! whole ones, so framing is driven entirely by the buffer, not by read
//! boundaries. Replies are fully built before any socket write, so the
//! keyspace lock is never held across I/O.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::commands::CommandHandler;
use crate::protocol::{malformed_line_len, parse_line, Line, Reply, Request};

/// Maximum size for the read buffer (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Counters shared by every connection task.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
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

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// One framed unit from the read buffer.
enum Framed {
    /// A whitespace-only line; consumed silently
    Empty,
    /// A complete command line
    Request(Request),
    /// A complete but malformed line; already discarded from the buffer
    Malformed,
}

/// Errors that can end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error on the socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Client closed the connection between commands
    #[error("client disconnected")]
    ClientDisconnected,

    /// Stream ended mid-line
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A single line exceeded the buffer cap
    #[error("buffer size limit exceeded")]
    BufferFull,

    /// The server asked the connection to wind down
    #[error("server shutting down")]
    Shutdown,
}

/// Serves a single client connection.
pub struct ConnectionHandler {
    /// Buffered writer over the TCP stream
    stream: BufWriter<TcpStream>,

    /// Client address, for logging
    addr: SocketAddr,

    /// Accumulates raw bytes until a full line is available
    buffer: BytesMut,

    /// The shared command dispatcher
    handler: CommandHandler,

    /// Flips to true when the server is shutting down
    shutdown: watch::Receiver<bool>,

    /// Shared connection counters
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        handler: CommandHandler,
        shutdown: watch::Receiver<bool>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            handler,
            shutdown,
            stats,
        }
    }

    /// Runs the connection to completion.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) | Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "client disconnected")
            }
            Err(ConnectionError::Shutdown) => {
                debug!(client = %self.addr, "connection closed for shutdown")
            }
            Err(ConnectionError::Io(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The read-dispatch-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(framed) = self.try_frame() {
                let reply = match framed {
                    Framed::Empty => continue,
                    Framed::Malformed => Reply::error("ERR syntax error"),
                    Framed::Request(request) => {
                        self.stats.command_processed();
                        self.handler.execute(request)
                    }
                };
                self.send_reply(&reply).await?;
            }

            self.read_more().await?;
        }
    }

    /// Frames one line out of the buffer, if a complete one is present.
    fn try_frame(&mut self) -> Option<Framed> {
        if self.buffer.is_empty() {
            return None;
        }

        match parse_line(&self.buffer) {
            Ok(Some((line, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                Some(match line {
                    Line::Empty => Framed::Empty,
                    Line::Request(request) => Framed::Request(request),
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!(client = %self.addr, error = %e, "malformed request line");
                let len = malformed_line_len(&self.buffer);
                let _ = self.buffer.split_to(len);
                Some(Framed::Malformed)
            }
        }
    }

    /// Waits for more socket data or the shutdown signal.
    async fn read_more(&mut self) -> Result<(), ConnectionError> {
        if *self.shutdown.borrow() {
            return Err(ConnectionError::Shutdown);
        }

        if self.buffer.len() >= MAX_BUFFER_SIZE {
            warn!(client = %self.addr, size = self.buffer.len(), "buffer size limit exceeded");
            return Err(ConnectionError::BufferFull);
        }
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(4096);
        }

        tokio::select! {
            read = self.stream.get_mut().read_buf(&mut self.buffer) => {
                let n = read?;
                if n == 0 {
                    return if self.buffer.is_empty() {
                        Err(ConnectionError::ClientDisconnected)
                    } else {
                        Err(ConnectionError::UnexpectedEof)
                    };
                }
                Ok(())
            }
            _ = self.shutdown.changed() => Err(ConnectionError::Shutdown),
        }
    }

    /// Serializes and writes one reply.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

/// Serves a client connection to completion, swallowing expected
/// teardown errors.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handler: CommandHandler,
    shutdown: watch::Receiver<bool>,
    stats: Arc<ConnectionStats>,
) {
    let connection = ConnectionHandler::new(stream, addr, handler, shutdown, stats);
    let _ = connection.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Keyspace;
    use tokio::net::TcpListener;

    async fn spawn_test_server() -> (SocketAddr, Arc<ConnectionStats>, watch::Sender<bool>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = Arc::new(Keyspace::new());
        let stats = Arc::new(ConnectionStats::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let accept_stats = Arc::clone(&stats);
        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = CommandHandler::new(Arc::clone(&store));
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    handler,
                    shutdown_rx.clone(),
                    Arc::clone(&accept_stats),
                ));
            }
        });

        (addr, stats, shutdown_tx)
    }

    async fn read_some(client: &mut TcpStream) -> Vec<u8> {
        let mut buf = [0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        buf[..n].to_vec()
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"PING\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"SET name flint\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"+OK\r\n");

        client.write_all(b"GET name\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"+flint\r\n");
    }

    #[tokio::test]
    async fn test_get_missing_is_null_bulk() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"GET nothing\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn test_array_reply_framing() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"LPUSH mylist a b c\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b":3\r\n");

        client.write_all(b"LRANGE mylist 0 -1\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"*3\r\n+c\r\n+b\r\n+a\r\n");
    }

    #[tokio::test]
    async fn test_empty_line_produces_no_reply() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"\r\n   \r\nPING\r\n").await.unwrap();
        // The only reply is the PONG; blank lines were swallowed.
        assert_eq!(read_some(&mut client).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_syntax_error_keeps_connection_open() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"SET k \"unclosed\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"-ERR syntax error\r\n");

        client.write_all(b"PING\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_pipelined_lines() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"SET a 1\r\nSET b 2\r\nGET a\r\nGET b\r\n")
            .await
            .unwrap();

        let mut collected = Vec::new();
        while collected.len() < 18 {
            let chunk = read_some(&mut client).await;
            assert!(!chunk.is_empty());
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, b"+OK\r\n+OK\r\n+1\r\n+2\r\n");
    }

    #[tokio::test]
    async fn test_quoted_value_over_wire() {
        let (addr, _, _tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"SET greeting \"hello world\"\r\n")
            .await
            .unwrap();
        assert_eq!(read_some(&mut client).await, b"+OK\r\n");

        client.write_all(b"GET greeting\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"+hello world\r\n");
    }

    #[tokio::test]
    async fn test_shutdown_signal_closes_idle_connection() {
        let (addr, _, shutdown_tx) = spawn_test_server().await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"PING\r\n").await.unwrap();
        assert_eq!(read_some(&mut client).await, b"+PONG\r\n");

        shutdown_tx.send(true).unwrap();

        // The handler drops the socket; the next read sees EOF.
        let mut buf = [0u8; 16];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, stats, _tx) = spawn_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"PING\r\n").await.unwrap();
        let _ = read_some(&mut client).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);
        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);

        drop(client);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }
}
