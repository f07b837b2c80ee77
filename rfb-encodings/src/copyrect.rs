//! CopyRect encoding decoder - copy a rectangle from elsewhere on screen.
//!
//! CopyRect (type 1) carries only the source position:
//!
//! ```text
//! +----------+----------+
//! | src_x    | src_y    |  2 bytes each (u16, network byte order)
//! +----------+----------+
//! ```
//!
//! The rectangle header gives the **destination**. Source and destination
//! may overlap; [`MutablePixelBuffer::copy_rect`] handles that.

use crate::{
    Decoder, MutablePixelBuffer, PixelFormat, Rectangle, RfbInStream, ENCODING_COPYRECT,
};
use anyhow::{Context, Result};
use rfb_common::{Point, Rect};
use tokio::io::AsyncRead;

pub struct CopyRectDecoder;

impl Decoder for CopyRectDecoder {
    fn encoding_type(&self) -> i32 {
        ENCODING_COPYRECT
    }

    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        _pixel_format: &PixelFormat,
        buffer: &mut dyn MutablePixelBuffer,
    ) -> Result<()> {
        // The source position is on the wire even for an empty rectangle.
        let src_x = stream
            .read_u16()
            .await
            .context("Failed to read CopyRect src_x")?;
        let src_y = stream
            .read_u16()
            .await
            .context("Failed to read CopyRect src_y")?;

        tracing::debug!(
            target: "rfb_encodings::framing",
            "CopyRect: ({},{}) -> [{},{} {}x{}]",
            src_x, src_y, rect.x, rect.y, rect.width, rect.height
        );

        if rect.width == 0 || rect.height == 0 {
            return Ok(());
        }

        let dest = Rect::new(
            i32::from(rect.x),
            i32::from(rect.y),
            u32::from(rect.width),
            u32::from(rect.height),
        );
        let src_offset = Point::new(
            i32::from(src_x) - i32::from(rect.x),
            i32::from(src_y) - i32::from(rect.y),
        );

        buffer
            .copy_rect(dest, src_offset)
            .context("Failed to copy rectangle within buffer")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfb_pixelbuffer::ManagedPixelBuffer;
    use std::io::Cursor;

    const GREEN: [u8; 4] = [0, 255, 0, 255];

    fn rect(x: u16, y: u16, width: u16, height: u16) -> Rectangle {
        Rectangle {
            x,
            y,
            width,
            height,
            encoding: ENCODING_COPYRECT,
        }
    }

    #[tokio::test]
    async fn test_copyrect_copies_region() {
        let mut buffer = ManagedPixelBuffer::new(10, 10);
        buffer.fill_rect(Rect::new(0, 0, 2, 2), GREEN).unwrap();

        let mut stream = RfbInStream::new(Cursor::new(vec![0, 0, 0, 0]));
        CopyRectDecoder
            .decode(
                &mut stream,
                &rect(5, 6, 2, 2),
                &PixelFormat::rgb888(),
                &mut buffer,
            )
            .await
            .unwrap();

        let image = buffer.into_image(vec![ENCODING_COPYRECT]);
        assert_eq!(image.pixel(5, 6), Some(GREEN));
        assert_eq!(image.pixel(6, 7), Some(GREEN));
        assert_eq!(image.pixel(7, 8), Some([0, 0, 0, 255]));
    }

    #[tokio::test]
    async fn test_copyrect_empty_still_consumes_source() {
        let mut buffer = ManagedPixelBuffer::new(4, 4);
        let mut stream = RfbInStream::new(Cursor::new(vec![0, 1, 0, 2, 0x7F]));
        CopyRectDecoder
            .decode(
                &mut stream,
                &rect(0, 0, 0, 0),
                &PixelFormat::rgb888(),
                &mut buffer,
            )
            .await
            .unwrap();
        assert_eq!(stream.read_u8().await.unwrap(), 0x7F);
    }

    #[tokio::test]
    async fn test_copyrect_source_out_of_bounds() {
        let mut buffer = ManagedPixelBuffer::new(4, 4);
        let mut stream = RfbInStream::new(Cursor::new(vec![0, 3, 0, 3]));
        let err = CopyRectDecoder
            .decode(
                &mut stream,
                &rect(0, 0, 2, 2),
                &PixelFormat::rgb888(),
                &mut buffer,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to copy rectangle"));
    }

    #[tokio::test]
    async fn test_copyrect_truncated() {
        let mut buffer = ManagedPixelBuffer::new(4, 4);
        let mut stream = RfbInStream::new(Cursor::new(vec![0, 1]));
        assert!(CopyRectDecoder
            .decode(
                &mut stream,
                &rect(0, 0, 1, 1),
                &PixelFormat::rgb888(),
                &mut buffer,
            )
            .await
            .is_err());
    }
}
