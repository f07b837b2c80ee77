//! Framebuffer assembly and decoder registry.
//!
//! A [`Framebuffer`] lives for one capture: it is sized from the session's
//! [`ScreenGeometry`], receives every rectangle of one FramebufferUpdate and
//! is then turned into an immutable [`FramebufferImage`].

use crate::errors::RfbClientError;
use rfb_common::ScreenGeometry;
use rfb_encodings as enc;
use rfb_encodings::{Decoder, MutablePixelBuffer, RfbInStream};
use rfb_pixelbuffer::{FramebufferImage, ManagedPixelBuffer, PixelFormat};
use rfb_protocol::messages::types::Rectangle;
use std::collections::HashMap;
use tokio::io::AsyncRead;

/// Rectangle count meaning "until a LastRect marker".
const UNKNOWN_RECT_COUNT: u16 = 0xFFFF;

/// Registry of decoders keyed by encoding type.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: HashMap<i32, DecoderEntry>,
}

impl DecoderRegistry {
    /// Create a registry with every encoding this client decodes.
    pub fn with_standard() -> Self {
        let mut reg = Self::default();
        reg.register(DecoderEntry::Raw(enc::RawDecoder));
        reg.register(DecoderEntry::CopyRect(enc::CopyRectDecoder));
        reg
    }

    fn register(&mut self, decoder: DecoderEntry) {
        self.decoders.insert(decoder.encoding_type(), decoder);
    }

    fn get(&self, encoding: i32) -> Option<&DecoderEntry> {
        self.decoders.get(&encoding)
    }

    /// Encodings to advertise in SetEncodings, most preferred first.
    pub fn advertised_encodings(&self) -> Vec<i32> {
        let mut encodings: Vec<i32> = self.decoders.keys().copied().collect();
        // Raw last: every server supports it and it is the most expensive.
        encodings.sort_by_key(|e| (*e == enc::ENCODING_RAW, *e));
        encodings
    }
}

/// Concrete decoder wrapper; `Decoder` has async methods and is not object safe.
enum DecoderEntry {
    Raw(enc::RawDecoder),
    CopyRect(enc::CopyRectDecoder),
}

impl DecoderEntry {
    fn encoding_type(&self) -> i32 {
        match self {
            Self::Raw(d) => d.encoding_type(),
            Self::CopyRect(d) => d.encoding_type(),
        }
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        buffer: &mut dyn MutablePixelBuffer,
    ) -> anyhow::Result<()> {
        match self {
            Self::Raw(d) => d.decode(stream, rect, pixel_format, buffer).await,
            Self::CopyRect(d) => d.decode(stream, rect, pixel_format, buffer).await,
        }
    }
}

/// Framebuffer state and decoder dispatcher for one capture.
pub struct Framebuffer {
    buffer: ManagedPixelBuffer,
    pixel_format: PixelFormat,
    registry: DecoderRegistry,
    encodings: Vec<i32>,
}

impl Framebuffer {
    /// Create an opaque-black framebuffer of the session's size.
    ///
    /// # Errors
    ///
    /// Returns [`RfbClientError::Decode`] when the server's pixel format
    /// cannot be converted (colour map, odd depth).
    pub fn new(geometry: ScreenGeometry, pixel_format: PixelFormat) -> Result<Self, RfbClientError> {
        pixel_format
            .ensure_decodable()
            .map_err(|e| RfbClientError::from_decode(&e))?;
        Ok(Self {
            buffer: ManagedPixelBuffer::new(u32::from(geometry.width), u32::from(geometry.height)),
            pixel_format,
            registry: DecoderRegistry::with_standard(),
            encodings: Vec::new(),
        })
    }

    /// Apply a single rectangle update from the server.
    pub async fn apply_rectangle<R: AsyncRead + Unpin>(
        &mut self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
    ) -> Result<(), RfbClientError> {
        let decoder = self
            .registry
            .get(rect.encoding)
            .ok_or(RfbClientError::UnsupportedEncoding(rect.encoding))?;

        decoder
            .decode(stream, rect, &self.pixel_format, &mut self.buffer)
            .await
            .map_err(|e| RfbClientError::from_decode(&e))?;

        if !self.encodings.contains(&rect.encoding) {
            self.encodings.push(rect.encoding);
        }
        Ok(())
    }

    /// Read and apply the rectangles of one FramebufferUpdate.
    ///
    /// `count` comes from the update header. A count of 0xFFFF means the
    /// server terminates the list with a LastRect pseudo-rectangle.
    /// Returns the number of rectangles applied.
    pub async fn apply_update_stream<R: AsyncRead + Unpin>(
        &mut self,
        stream: &mut RfbInStream<R>,
        count: u16,
    ) -> Result<usize, RfbClientError> {
        let mut applied = 0usize;
        loop {
            if count != UNKNOWN_RECT_COUNT && applied == usize::from(count) {
                break;
            }
            let rect = Rectangle::read_from(stream)
                .await
                .map_err(|e| RfbClientError::from_io("failed to read rectangle header", e))?;
            tracing::debug!(
                "FramebufferUpdate rect: x={}, y={}, w={}, h={}, encoding={} ({})",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                rect.encoding,
                enc::encoding_name(rect.encoding)
            );
            if count == UNKNOWN_RECT_COUNT && rect.encoding == enc::ENCODING_LAST_RECT {
                break;
            }
            self.apply_rectangle(stream, &rect).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Finish the capture.
    pub fn into_image(self) -> FramebufferImage {
        self.buffer.into_image(self.encodings)
    }
}
