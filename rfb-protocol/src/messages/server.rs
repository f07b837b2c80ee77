//! Server-to-client PDUs.
//!
//! Only headers are parsed for FramebufferUpdate; rectangle payloads are
//! encoding specific and belong to the decoders.

use super::types::{PixelFormat, MSG_BELL, MSG_FRAMEBUFFER_UPDATE, MSG_SERVER_CUT_TEXT};
use crate::io::{RfbInStream, RfbOutStream};
use tokio::io::{AsyncRead, AsyncWrite};

/// Desktop names longer than this are treated as a protocol violation.
pub const MAX_DESKTOP_NAME_LEN: usize = 64 * 1024;

/// Clipboard payloads longer than this are treated as a protocol violation.
pub const MAX_CUT_TEXT_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInit {
    pub framebuffer_width: u16,
    pub framebuffer_height: u16,
    pub pixel_format: PixelFormat,
    pub name: String,
}

impl ServerInit {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        let framebuffer_width = stream.read_u16().await?;
        let framebuffer_height = stream.read_u16().await?;
        let pixel_format = PixelFormat::read_from(stream).await?;
        let name = stream.read_length_prefixed(MAX_DESKTOP_NAME_LEN).await?;

        Ok(Self {
            framebuffer_width,
            framebuffer_height,
            pixel_format,
            name: String::from_utf8_lossy(&name).into_owned(),
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u16(self.framebuffer_width);
        stream.write_u16(self.framebuffer_height);
        self.pixel_format.write_to(stream);
        stream.write_u32(self.name.len() as u32);
        stream.write_bytes(self.name.as_bytes());
    }
}

/// FramebufferUpdate up to and including the rectangle count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferUpdateHeader {
    pub rectangles: u16,
}

impl FramebufferUpdateHeader {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(1).await?;
        Ok(Self {
            rectangles: stream.read_u16().await?,
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_FRAMEBUFFER_UPDATE);
        stream.write_u8(0);
        stream.write_u16(self.rectangles);
    }
}

/// Palette update. Entries are consumed and dropped because only
/// true-colour formats are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetColourMapEntries {
    pub first_colour: u16,
    pub colours: u16,
}

impl SetColourMapEntries {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(1).await?;
        let first_colour = stream.read_u16().await?;
        let colours = stream.read_u16().await?;
        stream.skip(colours as usize * 6).await?;
        Ok(Self {
            first_colour,
            colours,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCutText {
    pub text: String,
}

impl ServerCutText {
    pub async fn read_from<R: AsyncRead + Unpin>(
        stream: &mut RfbInStream<R>,
    ) -> std::io::Result<Self> {
        stream.skip(3).await?;
        let bytes = stream.read_length_prefixed(MAX_CUT_TEXT_LEN).await?;
        // Latin-1 on the wire: every byte is its own code point.
        Ok(Self {
            text: bytes.iter().map(|&b| char::from(b)).collect(),
        })
    }

    pub fn write_to<W: AsyncWrite + Unpin>(&self, stream: &mut RfbOutStream<W>) {
        stream.write_u8(MSG_SERVER_CUT_TEXT);
        stream.write_bytes(&[0, 0, 0]);
        stream.write_u32(self.text.len() as u32);
        stream.write_bytes(self.text.as_bytes());
    }
}

/// Bell has no payload beyond its type byte.
pub fn write_bell<W: AsyncWrite + Unpin>(stream: &mut RfbOutStream<W>) {
    stream.write_u8(MSG_BELL);
}
