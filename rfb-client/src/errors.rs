//! Error types for the RFB automation client.
//!
//! Every failure surfaced by this crate is an [`RfbClientError`]. Each variant
//! belongs to exactly one [`ErrorKind`], which is what callers at the dispatch
//! boundary match on.

use serde::Serialize;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a remote framebuffer server.
#[derive(Debug, Error)]
pub enum RfbClientError {
    /// TCP connect failure, reset, EOF or any other transport-level problem.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A connect, read or write did not finish within the configured timeout.
    #[error("Connection timeout after {0:?}")]
    Timeout(Duration),

    /// The transport has already been closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The operation was cancelled and its transport torn down.
    #[error("Operation cancelled")]
    Cancelled,

    /// Malformed or unexpected data, unsupported version, no usable security type.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server rejected our credentials.
    #[error("Authentication failed: result code {code}{}", format_reason(.reason))]
    Authentication {
        /// Result code from the SecurityResult message (1 = failed, 2 = too many attempts).
        code: u32,
        /// Failure reason; only sent by 3.8 servers.
        reason: Option<String>,
    },

    /// Malformed or short rectangle data, or an unusable pixel format.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The server sent a rectangle in an encoding we cannot decode.
    #[error("Unsupported encoding: {0} ({})", encoding_label(.0))]
    UnsupportedEncoding(i32),

    /// Invalid or unresolvable action parameters.
    #[error("Action error: {0}")]
    Action(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn format_reason(reason: &Option<String>) -> String {
    match reason {
        Some(r) if !r.is_empty() => format!(" ({r})"),
        _ => String::new(),
    }
}

fn encoding_label(encoding: &i32) -> &'static str {
    rfb_encodings::encoding_name(*encoding)
}

/// Coarse error category reported across the dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unreachable host, refusal, timeout, mid-session disconnect.
    Connection,
    /// Wire-level violation.
    Protocol,
    /// Credentials rejected.
    Authentication,
    /// Pixel data could not be decoded.
    Decode,
    /// Bad action parameters.
    Action,
    /// Invalid configuration.
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::Protocol => "protocol",
            Self::Authentication => "authentication",
            Self::Decode => "decode",
            Self::Action => "action",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// io error kinds that mean the peer or the network went away.
fn is_transport_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::TimedOut
    )
}

impl RfbClientError {
    /// Map an I/O error from the wire layer.
    ///
    /// Disconnects and timeouts become [`RfbClientError::Connection`];
    /// anything the protocol layer flagged as bad data becomes
    /// [`RfbClientError::Protocol`].
    pub fn from_io(context: &str, err: io::Error) -> Self {
        if is_transport_kind(err.kind()) {
            Self::Connection(format!("{context}: {err}"))
        } else {
            Self::Protocol(format!("{context}: {err}"))
        }
    }

    /// Map a decoder failure.
    ///
    /// A reset or broken pipe underneath the decoder is still a connection
    /// failure. A short read is a decode failure.
    pub fn from_decode(err: &anyhow::Error) -> Self {
        let transport = err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<io::Error>())
            .any(|io_err| {
                is_transport_kind(io_err.kind()) && io_err.kind() != io::ErrorKind::UnexpectedEof
            });
        if transport {
            Self::Connection(format!("{err:#}"))
        } else {
            Self::Decode(format!("{err:#}"))
        }
    }

    /// The category this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::ConnectionClosed | Self::Cancelled => {
                ErrorKind::Connection
            }
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Decode(_) | Self::UnsupportedEncoding(_) => ErrorKind::Decode,
            Self::Action(_) => ErrorKind::Action,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns true if this error is potentially retryable.
    ///
    /// Purely informational. Nothing in this crate retries; the caller decides.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout(_) | Self::ConnectionClosed
        )
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(RfbClientError::Connection("refused".to_string()).is_retryable());
        assert!(RfbClientError::Timeout(Duration::from_secs(10)).is_retryable());
        assert!(RfbClientError::ConnectionClosed.is_retryable());

        assert!(RfbClientError::Authentication {
            code: 1,
            reason: None
        }
        .is_fatal());
        assert!(RfbClientError::Config("invalid host".to_string()).is_fatal());
        assert!(RfbClientError::UnsupportedEncoding(999).is_fatal());
        assert!(RfbClientError::Cancelled.is_fatal());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RfbClientError::Cancelled.kind(), ErrorKind::Connection);
        assert_eq!(
            RfbClientError::UnsupportedEncoding(16).kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            RfbClientError::Action("bad key".into()).kind(),
            ErrorKind::Action
        );
        assert_eq!(ErrorKind::Authentication.to_string(), "authentication");
    }

    #[test]
    fn test_error_display() {
        let err = RfbClientError::Authentication {
            code: 1,
            reason: Some("wrong password".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Authentication failed: result code 1 (wrong password)"
        );

        let err = RfbClientError::Authentication {
            code: 2,
            reason: None,
        };
        assert_eq!(err.to_string(), "Authentication failed: result code 2");

        let err = RfbClientError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));

        let err = RfbClientError::UnsupportedEncoding(16);
        assert_eq!(err.to_string(), "Unsupported encoding: 16 (ZRLE)");
    }

    #[test]
    fn test_from_io_mapping() {
        let eof = io::Error::from(io::ErrorKind::UnexpectedEof);
        assert_eq!(
            RfbClientError::from_io("reading banner", eof).kind(),
            ErrorKind::Connection
        );

        let bad = io::Error::new(io::ErrorKind::InvalidData, "not an RFB banner");
        let err = RfbClientError::from_io("reading banner", bad);
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(err.to_string().contains("not an RFB banner"));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "refused: busy");
        assert_eq!(
            RfbClientError::from_io("security", denied).kind(),
            ErrorKind::Protocol
        );
    }

    #[test]
    fn test_from_decode_mapping() {
        let short = anyhow::Error::new(io::Error::from(io::ErrorKind::UnexpectedEof))
            .context("Failed to read raw pixel data from stream");
        assert_eq!(RfbClientError::from_decode(&short).kind(), ErrorKind::Decode);

        let reset = anyhow::Error::new(io::Error::from(io::ErrorKind::ConnectionReset))
            .context("Failed to read raw pixel data from stream");
        assert_eq!(
            RfbClientError::from_decode(&reset).kind(),
            ErrorKind::Connection
        );
    }
}
