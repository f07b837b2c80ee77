//! TCP transport for RFB connections.
//!
//! A [`Transport`] owns exactly one byte stream, split into buffered
//! [`RfbInStream`]/[`RfbOutStream`] halves inside an [`RfbConnection`] that
//! also tracks the handshake state. Every read and write issued through
//! [`Transport::timed`] is bounded by the configured timeout.
//!
//! # Examples
//!
//! ```no_run
//! use rfb_client::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), rfb_client::RfbClientError> {
//! let mut transport = Transport::connect_tcp("localhost", 5900, Duration::from_secs(5)).await?;
//! // ... handshake ...
//! transport.close().await;
//! # Ok(())
//! # }
//! ```

use crate::errors::RfbClientError;
use rfb_protocol::{ConnectionState, RfbConnection};
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;

/// One connection to one server. Never shared, never reused.
pub struct Transport<S = TcpStream> {
    connection: RfbConnection<ReadHalf<S>, WriteHalf<S>>,
    timeout: Duration,
}

impl Transport<TcpStream> {
    /// Connect to a server via plain TCP.
    ///
    /// TCP_NODELAY is enabled; input events are tiny and latency matters
    /// more than throughput.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::Timeout`] when the connect does not finish
    /// within `timeout`, and [`RfbClientError::Connection`] on DNS failure or
    /// refusal.
    pub async fn connect_tcp(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, RfbClientError> {
        let addr = format!("{}:{}", host, port);
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RfbClientError::Connection(format!(
                    "Failed to connect to {}: {}",
                    addr, e
                )))
            }
            Err(_) => return Err(RfbClientError::Timeout(timeout)),
        };

        stream.set_nodelay(true).map_err(|e| {
            RfbClientError::Connection(format!("Failed to set TCP_NODELAY: {}", e))
        })?;

        let peer = match (stream.local_addr(), stream.peer_addr()) {
            (Ok(local), Ok(peer)) => {
                tracing::info!("Connected via TCP: local={} -> remote={}", local, peer);
                peer.to_string()
            }
            _ => {
                tracing::info!("Connected to {} via plain TCP", addr);
                addr
            }
        };

        Ok(Self::from_stream(stream, peer, timeout))
    }
}

impl<S: AsyncRead + AsyncWrite> Transport<S> {
    /// Wrap an already-connected stream.
    pub fn from_stream(stream: S, peer_address: String, timeout: Duration) -> Self {
        let (read, write) = tokio::io::split(stream);
        let mut connection = RfbConnection::new(read, write);
        connection.set_peer_address(peer_address);
        Self {
            connection,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn peer_address(&self) -> &str {
        self.connection.peer_address()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn is_closed(&self) -> bool {
        self.connection.state() == ConnectionState::Closed
    }

    /// The stream pair and handshake state.
    pub fn connection(&mut self) -> &mut RfbConnection<ReadHalf<S>, WriteHalf<S>> {
        &mut self.connection
    }

    /// Advance the handshake state machine.
    pub fn transition_to(&mut self, next: ConnectionState) -> Result<(), RfbClientError> {
        let from = self.connection.state();
        self.connection
            .transition_to(next)
            .map_err(|e| RfbClientError::Protocol(e.to_string()))?;
        tracing::debug!(peer = %self.connection.peer_address(), "state {} -> {}", from, next);
        Ok(())
    }

    /// Read exactly `n` bytes.
    pub async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, RfbClientError> {
        if self.is_closed() {
            return Err(RfbClientError::ConnectionClosed);
        }
        let timeout = self.timeout;
        timed(timeout, "read", self.connection.instream().read_vec(n)).await
    }

    /// Write `bytes` and flush them to the socket.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<(), RfbClientError> {
        if self.is_closed() {
            return Err(RfbClientError::ConnectionClosed);
        }
        let timeout = self.timeout;
        let out = self.connection.outstream();
        out.write_bytes(bytes);
        timed(timeout, "write", out.flush()).await
    }

    /// Close the connection.
    ///
    /// Idempotent and safe after any failure. A shutdown error is logged
    /// and otherwise ignored, the socket is released either way once the
    /// transport is dropped.
    pub async fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.connection.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("shutdown of {} failed: {}", self.peer_address(), e),
            Err(_) => tracing::debug!("shutdown of {} timed out", self.peer_address()),
        }
        tracing::info!("Closed connection to {}", self.peer_address());
    }
}

/// Run one wire exchange under `timeout`, mapping failures to client errors.
pub async fn timed<T, F>(timeout: Duration, context: &str, fut: F) -> Result<T, RfbClientError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|e| RfbClientError::from_io(context, e)),
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", context, timeout);
            Err(RfbClientError::Timeout(timeout))
        }
    }
}
