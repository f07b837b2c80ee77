//! RFB (Remote Framebuffer) protocol implementation.
//!
//! This crate is the wire layer for the automation client: buffered I/O,
//! PDU serialization, the version/security handshake, VNC authentication and
//! the connection state machine. It does not open sockets; callers hand it any
//! `AsyncRead`/`AsyncWrite` pair.
//!
//! # Modules
//!
//! - [`io`] - Buffered I/O streams (RfbInStream, RfbOutStream)
//! - [`messages`] - Client and server PDUs
//! - [`handshake`] - Version and security negotiation, ClientInit/ServerInit
//! - [`auth`] - VNC DES challenge/response and SecurityResult
//! - [`connection`] - Connection state machine
//!
//! # Examples
//!
//! ```no_run
//! use rfb_protocol::{handshake, RfbConnection};
//!
//! # async fn example() -> std::io::Result<()> {
//! let socket = tokio::net::TcpStream::connect("localhost:5900").await?;
//! let (reader, writer) = tokio::io::split(socket);
//! let mut conn = RfbConnection::new(reader, writer);
//! let (instream, outstream) = conn.streams();
//! let version = handshake::negotiate_version(instream, outstream).await?;
//! println!("speaking RFB {}", version);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod connection;
pub mod handshake;
pub mod io;
pub mod messages;

pub use auth::SecurityResult;
pub use connection::{ConnectionState, RfbConnection};
pub use handshake::{NegotiatedVersion, SecurityNegotiation};
pub use io::{RfbInStream, RfbOutStream};
pub use messages::{ClientMessage, ServerMessage};
