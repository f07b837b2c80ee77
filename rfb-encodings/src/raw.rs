//! Raw encoding decoder - uncompressed pixel data.
//!
//! Raw encoding (type 0) sends `width * height * bytes_per_pixel` bytes in
//! the server's pixel format, row-major, with no compression or padding.
//!
//! ```text
//! +-------------+
//! | Pixel data  |  width * height * bytes_per_pixel bytes
//! +-------------+
//! ```

use crate::{Decoder, MutablePixelBuffer, PixelFormat, Rectangle, RfbInStream, ENCODING_RAW};
use anyhow::{bail, Context, Result};
use rfb_common::Rect;
use tokio::io::AsyncRead;

/// Decoder for raw (uncompressed) pixel data.
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_RAW
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        buffer: &mut dyn MutablePixelBuffer,
    ) -> Result<()> {
        let buffer_before = stream.available();
        tracing::debug!(
            target: "rfb_encodings::framing",
            "Raw decode start: rect=[{},{} {}x{}] buffer_before={}",
            rect.x, rect.y, rect.width, rect.height,
            buffer_before
        );

        let width = rect.width as usize;
        let height = rect.height as usize;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let dest_rect = Rect::new(
            i32::from(rect.x),
            i32::from(rect.y),
            u32::from(rect.width),
            u32::from(rect.height),
        );
        let (fb_width, fb_height) = buffer.dimensions();
        if !dest_rect.fits_within(fb_width, fb_height) {
            bail!(
                "Raw rectangle [{},{} {}x{}] out of bounds for {}x{} framebuffer",
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                fb_width,
                fb_height
            );
        }

        let bytes_per_pixel = pixel_format.bytes_per_pixel() as usize;
        if bytes_per_pixel == 0 {
            bail!("pixel format has zero bits per pixel");
        }
        let wire = stream
            .read_vec(width * height * bytes_per_pixel)
            .await
            .context("Failed to read raw pixel data from stream")?;

        let mut rgba = Vec::with_capacity(width * height * 4);
        for pixel in wire.chunks_exact(bytes_per_pixel) {
            rgba.extend_from_slice(&pixel_format.to_rgba(pixel));
        }

        buffer
            .image_rect(dest_rect, &rgba, width)
            .context("Failed to write raw pixel data to buffer")?;

        let buffer_after = stream.available();
        tracing::debug!(
            target: "rfb_encodings::framing",
            "Raw decode end: bytes_consumed={}, buffer_after={}",
            wire.len(),
            buffer_after
        );

        Ok(())
    }
}
