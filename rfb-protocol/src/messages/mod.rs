//! RFB protocol data units.
//!
//! - [`types`] - PixelFormat, rectangle headers and numeric constants
//! - [`client`] - PDUs the automation client sends
//! - [`server`] - PDUs the server sends after initialization
//!
//! All multi-byte integers are big-endian. PDU layouts are fixed; there is no
//! leeway for alternative field orders.

pub mod client;
pub mod server;
pub mod types;

#[cfg(test)]
mod proptest_framing;

pub use types::{
    PixelFormat, Rectangle, ENCODING_COPYRECT, ENCODING_DESKTOP_SIZE, ENCODING_LAST_RECT,
    ENCODING_RAW, SECURITY_TYPE_INVALID, SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH,
};

pub use server::{FramebufferUpdateHeader, ServerCutText, ServerInit, SetColourMapEntries};

pub use client::{ClientInit, FramebufferUpdateRequest, KeyEvent, PointerEvent, SetEncodings};

use crate::io::{RfbInStream, RfbOutStream};
use tokio::io::{AsyncRead, AsyncWrite};

/// Any PDU a client may send after initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    SetEncodings(SetEncodings),
    FramebufferUpdateRequest(FramebufferUpdateRequest),
    KeyEvent(KeyEvent),
    PointerEvent(PointerEvent),
}

impl ClientMessage {
    /// Read one client PDU including its type byte.
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        let message_type = stream.read_u8().await?;
        match message_type {
            types::MSG_SET_ENCODINGS => Ok(Self::SetEncodings(SetEncodings::read_from(stream).await?)),
            types::MSG_FRAMEBUFFER_UPDATE_REQUEST => Ok(Self::FramebufferUpdateRequest(
                FramebufferUpdateRequest::read_from(stream).await?,
            )),
            types::MSG_KEY_EVENT => Ok(Self::KeyEvent(KeyEvent::read_from(stream).await?)),
            types::MSG_POINTER_EVENT => Ok(Self::PointerEvent(PointerEvent::read_from(stream).await?)),
            other => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown client message type: {}", other),
            )),
        }
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        match self {
            Self::SetEncodings(msg) => msg.write_to(stream),
            Self::FramebufferUpdateRequest(msg) => msg.write_to(stream),
            Self::KeyEvent(msg) => msg.write_to(stream),
            Self::PointerEvent(msg) => msg.write_to(stream),
        }
    }
}

/// Any PDU a server may send after initialization.
///
/// For framebuffer updates only the header is consumed; the caller must read
/// exactly `rectangles` rectangles next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    FramebufferUpdate(FramebufferUpdateHeader),
    SetColourMapEntries(SetColourMapEntries),
    Bell,
    ServerCutText(ServerCutText),
}

impl ServerMessage {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        let message_type = stream.read_u8().await?;
        match message_type {
            types::MSG_FRAMEBUFFER_UPDATE => Ok(Self::FramebufferUpdate(
                FramebufferUpdateHeader::read_from(stream).await?,
            )),
            types::MSG_SET_COLOUR_MAP_ENTRIES => Ok(Self::SetColourMapEntries(
                SetColourMapEntries::read_from(stream).await?,
            )),
            types::MSG_BELL => Ok(Self::Bell),
            types::MSG_SERVER_CUT_TEXT => {
                Ok(Self::ServerCutText(ServerCutText::read_from(stream).await?))
            }
            other => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown server message type: {}", other),
            )),
        }
    }
}
