//! RFB connection state machine.
//!
//! A connection moves strictly forward through the handshake:
//!
//! 1. **Unconnected** - socket open, nothing exchanged
//! 2. **VersionExchanged** - banners exchanged
//! 3. **SecurityTypeChosen** - security type agreed
//! 4. **Authenticating** - VNC challenge/response in flight (skipped for None)
//! 5. **Initialized** - ClientInit sent and ServerInit received
//! 6. **Ready** - encodings advertised, input and updates may flow
//! 7. **Closed** - terminal, reachable from every state
//!
//! [`RfbConnection`] pairs the state with the buffered streams so the two
//! cannot drift apart.

use crate::handshake::NegotiatedVersion;
use crate::io::{RfbInStream, RfbOutStream};
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Unconnected,
    VersionExchanged,
    SecurityTypeChosen,
    Authenticating,
    Initialized,
    Ready,
    Closed,
}

impl ConnectionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (Unconnected, VersionExchanged)
            | (VersionExchanged, SecurityTypeChosen)
            | (SecurityTypeChosen, Authenticating)
            | (SecurityTypeChosen, Initialized)
            | (Authenticating, Initialized)
            | (Initialized, Ready) => true,
            _ => false,
        }
    }

    pub fn is_ready(self) -> bool {
        self == ConnectionState::Ready
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconnected => write!(f, "Unconnected"),
            Self::VersionExchanged => write!(f, "VersionExchanged"),
            Self::SecurityTypeChosen => write!(f, "SecurityTypeChosen"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Initialized => write!(f, "Initialized"),
            Self::Ready => write!(f, "Ready"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Streams plus handshake state for one server connection.
pub struct RfbConnection<R, W> {
    instream: RfbInStream<R>,
    outstream: RfbOutStream<W>,
    state: ConnectionState,
    peer_address: String,
    version: Option<NegotiatedVersion>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> RfbConnection<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            instream: RfbInStream::new(reader),
            outstream: RfbOutStream::new(writer),
            state: ConnectionState::Unconnected,
            peer_address: String::from("unknown"),
            version: None,
        }
    }

    pub fn set_peer_address(&mut self, address: String) {
        self.peer_address = address;
    }

    pub fn peer_address(&self) -> &str {
        &self.peer_address
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn version(&self) -> Option<NegotiatedVersion> {
        self.version
    }

    pub fn set_version(&mut self, version: NegotiatedVersion) {
        self.version = Some(version);
    }

    /// Move to `new_state`, rejecting illegal edges.
    ///
    /// # Errors
    ///
    /// Returns an error when the edge is not allowed, for example
    /// `Closed -> Ready` or `Unconnected -> Initialized`.
    pub fn transition_to(&mut self, new_state: ConnectionState) -> anyhow::Result<()> {
        if !self.state.can_transition_to(new_state) {
            anyhow::bail!("Invalid state transition: {} -> {}", self.state, new_state);
        }
        self.state = new_state;
        Ok(())
    }

    pub fn instream(&mut self) -> &mut RfbInStream<R> {
        &mut self.instream
    }

    pub fn outstream(&mut self) -> &mut RfbOutStream<W> {
        &mut self.outstream
    }

    /// Both halves at once, for exchanges that read and write.
    pub fn streams(&mut self) -> (&mut RfbInStream<R>, &mut RfbOutStream<W>) {
        (&mut self.instream, &mut self.outstream)
    }

    /// Shut the write half down and mark the connection closed.
    ///
    /// Idempotent; a second call does nothing.
    pub async fn close(&mut self) -> std::io::Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closed;
        self.outstream.shutdown().await
    }
}
