//! Owned RGBA framebuffer that decoders assemble an update into.
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::{ManagedPixelBuffer, MutablePixelBuffer, PixelBuffer};
//! use rfb_common::Rect;
//!
//! let mut buffer = ManagedPixelBuffer::new(100, 100);
//! buffer.fill_rect(Rect::new(10, 10, 50, 50), [255, 0, 0, 255]).unwrap();
//! assert_eq!(buffer.dimensions(), (100, 100));
//!
//! let image = buffer.into_image(vec![0]);
//! assert_eq!(image.pixel(20, 20), Some([255, 0, 0, 255]));
//! ```

use crate::buffer::RGBA_BYTES_PER_PIXEL;
use crate::{FramebufferImage, MutablePixelBuffer, PixelBuffer};
use anyhow::{anyhow, Result};
use rfb_common::{Point, Rect};

/// Row-major RGBA buffer with stride equal to width.
///
/// Starts out opaque black, so regions the server never sends stay black in
/// the finished image.
#[derive(Debug, Clone)]
pub struct ManagedPixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ManagedPixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * RGBA_BYTES_PER_PIXEL];
        for pixel in data.chunks_exact_mut(RGBA_BYTES_PER_PIXEL) {
            pixel[3] = 255;
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Stride in pixels.
    pub fn stride(&self) -> usize {
        self.width as usize
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into an immutable image.
    pub fn into_image(self, encodings: Vec<i32>) -> FramebufferImage {
        FramebufferImage::new(self.width, self.height, self.data, encodings)
    }

    fn validate_rect(&self, rect: Rect) -> Result<()> {
        if !rect.fits_within(self.width, self.height) {
            return Err(anyhow!(
                "Rectangle out of bounds: {:?} (buffer size: {}x{})",
                rect,
                self.width,
                self.height
            ));
        }
        Ok(())
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        (y as usize * self.stride() + x as usize) * RGBA_BYTES_PER_PIXEL
    }
}

impl PixelBuffer for ManagedPixelBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_buffer(&self, rect: Rect, stride: &mut usize) -> Option<&[u8]> {
        if self.validate_rect(rect).is_err() {
            return None;
        }
        *stride = self.stride();
        let start = self.offset(rect.x, rect.y);
        Some(&self.data[start..])
    }
}

impl MutablePixelBuffer for ManagedPixelBuffer {
    fn image_rect(&mut self, dest: Rect, pixels: &[u8], stride: usize) -> Result<()> {
        self.validate_rect(dest)?;
        if dest.is_empty() {
            return Ok(());
        }

        let row_bytes = dest.width as usize * RGBA_BYTES_PER_PIXEL;
        let src_stride = if stride == 0 {
            dest.width as usize
        } else {
            stride
        };
        let src_stride_bytes = src_stride * RGBA_BYTES_PER_PIXEL;

        let required = src_stride_bytes * (dest.height as usize - 1) + row_bytes;
        if pixels.len() < required {
            return Err(anyhow!(
                "Insufficient source data: got {} bytes, need at least {}",
                pixels.len(),
                required
            ));
        }

        for y in 0..dest.height as usize {
            let dst = self.offset(dest.x, dest.y + y as i32);
            let src = y * src_stride_bytes;
            self.data[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
        }
        Ok(())
    }

    fn copy_rect(&mut self, dest: Rect, src_offset: Point) -> Result<()> {
        self.validate_rect(dest)?;
        let src = Rect::new(
            dest.x + src_offset.x,
            dest.y + src_offset.y,
            dest.width,
            dest.height,
        );
        self.validate_rect(src)?;

        let row_bytes = dest.width as usize * RGBA_BYTES_PER_PIXEL;
        let rows = dest.height as usize;
        for i in 0..rows {
            // Source above the destination: walk bottom-up so rows are read
            // before they are overwritten.
            let y = if src_offset.y < 0 { rows - 1 - i } else { i } as i32;
            let from = self.offset(src.x, src.y + y);
            let to = self.offset(dest.x, dest.y + y);
            self.data.copy_within(from..from + row_bytes, to);
        }
        Ok(())
    }

    fn fill_rect(&mut self, rect: Rect, rgba: [u8; 4]) -> Result<()> {
        self.validate_rect(rect)?;
        for y in 0..rect.height as usize {
            let row = self.offset(rect.x, rect.y + y as i32);
            for pixel in self.data[row..row + rect.width as usize * RGBA_BYTES_PER_PIXEL]
                .chunks_exact_mut(RGBA_BYTES_PER_PIXEL)
            {
                pixel.copy_from_slice(&rgba);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn pixel_at(buffer: &ManagedPixelBuffer, x: i32, y: i32) -> [u8; 4] {
        let mut stride = 0;
        let slice = buffer.get_buffer(Rect::new(x, y, 1, 1), &mut stride).unwrap();
        [slice[0], slice[1], slice[2], slice[3]]
    }

    #[test]
    fn test_create_buffer_is_opaque_black() {
        let buffer = ManagedPixelBuffer::new(100, 50);
        assert_eq!(buffer.dimensions(), (100, 50));
        assert_eq!(buffer.stride(), 100);
        assert_eq!(buffer.data().len(), 100 * 50 * 4);
        assert_eq!(pixel_at(&buffer, 99, 49), [0, 0, 0, 255]);
    }

    #[test]
    fn test_fill_rect() {
        let mut buffer = ManagedPixelBuffer::new(100, 100);
        buffer.fill_rect(Rect::new(10, 10, 20, 20), RED).unwrap();
        assert_eq!(pixel_at(&buffer, 15, 15), RED);
        assert_eq!(pixel_at(&buffer, 30, 30), [0, 0, 0, 255]);
    }

    #[test]
    fn test_copy_rect_non_overlapping() {
        let mut buffer = ManagedPixelBuffer::new(100, 100);
        buffer.fill_rect(Rect::new(10, 10, 20, 20), RED).unwrap();

        // Source at (10, 10), destination at (50, 50).
        buffer
            .copy_rect(Rect::new(50, 50, 20, 20), Point::new(-40, -40))
            .unwrap();
        assert_eq!(pixel_at(&buffer, 55, 55), RED);
        assert_eq!(pixel_at(&buffer, 69, 69), RED);
    }

    #[test]
    fn test_copy_rect_overlapping_down() {
        let mut buffer = ManagedPixelBuffer::new(100, 100);
        buffer.fill_rect(Rect::new(20, 20, 30, 10), BLUE).unwrap();
        buffer.fill_rect(Rect::new(20, 30, 30, 20), RED).unwrap();

        // Shift the 30x30 block at (20,20) down by 10 rows.
        buffer
            .copy_rect(Rect::new(20, 30, 30, 30), Point::new(0, -10))
            .unwrap();
        assert_eq!(pixel_at(&buffer, 25, 30), BLUE);
        assert_eq!(pixel_at(&buffer, 25, 39), BLUE);
        assert_eq!(pixel_at(&buffer, 25, 40), RED);
        assert_eq!(pixel_at(&buffer, 25, 59), RED);
    }

    #[test]
    fn test_copy_rect_overlapping_up() {
        let mut buffer = ManagedPixelBuffer::new(10, 10);
        buffer.fill_rect(Rect::new(0, 5, 10, 1), RED).unwrap();
        buffer.fill_rect(Rect::new(0, 6, 10, 1), BLUE).unwrap();

        // Move rows 5..7 up to rows 4..6.
        buffer
            .copy_rect(Rect::new(0, 4, 10, 2), Point::new(0, 1))
            .unwrap();
        assert_eq!(pixel_at(&buffer, 0, 4), RED);
        assert_eq!(pixel_at(&buffer, 0, 5), BLUE);
    }

    #[test]
    fn test_copy_rect_source_out_of_bounds() {
        let mut buffer = ManagedPixelBuffer::new(10, 10);
        assert!(buffer
            .copy_rect(Rect::new(0, 0, 5, 5), Point::new(8, 0))
            .is_err());
    }

    #[test]
    fn test_image_rect_tightly_packed() {
        let mut buffer = ManagedPixelBuffer::new(100, 100);
        let image: Vec<u8> = RED.iter().copied().cycle().take(10 * 10 * 4).collect();
        buffer.image_rect(Rect::new(30, 30, 10, 10), &image, 0).unwrap();
        assert_eq!(pixel_at(&buffer, 35, 35), RED);
        assert_eq!(pixel_at(&buffer, 40, 40), [0, 0, 0, 255]);
    }

    #[test]
    fn test_image_rect_with_stride() {
        let mut buffer = ManagedPixelBuffer::new(100, 100);
        let mut image = Vec::new();
        for _ in 0..10 {
            for _ in 0..10 {
                image.extend_from_slice(&BLUE);
            }
            image.extend_from_slice(&[0u8; 10 * 4]);
        }
        buffer.image_rect(Rect::new(40, 40, 10, 10), &image, 20).unwrap();
        assert_eq!(pixel_at(&buffer, 45, 45), BLUE);
    }

    #[test]
    fn test_image_rect_short_data() {
        let mut buffer = ManagedPixelBuffer::new(10, 10);
        let err = buffer
            .image_rect(Rect::new(0, 0, 2, 2), &[0u8; 15], 0)
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient"));
    }

    #[test]
    fn test_validate_rect_out_of_bounds() {
        let buffer = ManagedPixelBuffer::new(100, 100);
        assert!(buffer.validate_rect(Rect::new(90, 50, 20, 10)).is_err());
        assert!(buffer.validate_rect(Rect::new(50, 90, 10, 20)).is_err());
        assert!(buffer.validate_rect(Rect::new(-1, 0, 1, 1)).is_err());
        assert!(buffer.validate_rect(Rect::new(50, 50, 40, 40)).is_ok());
    }

    #[test]
    fn test_into_image_keeps_pixels() {
        let mut buffer = ManagedPixelBuffer::new(4, 3);
        buffer.fill_rect(Rect::new(3, 2, 1, 1), BLUE).unwrap();
        let image = buffer.into_image(vec![0, 1]);
        assert_eq!(image.width(), 4);
        assert_eq!(image.height(), 3);
        assert_eq!(image.encodings(), &[0, 1]);
        assert_eq!(image.pixel(3, 2), Some(BLUE));
    }
}
