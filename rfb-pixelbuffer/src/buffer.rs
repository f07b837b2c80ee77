//! Pixel buffer traits.
//!
//! Buffers hold RGBA8 pixels, 4 bytes per pixel, row-major. Decoders convert
//! from the server's [`crate::PixelFormat`] before writing, so nothing past
//! the decoder needs to know the wire format.
//!
//! Strides are measured in **pixels**, not bytes.

use anyhow::Result;
use rfb_common::{Point, Rect};

/// Bytes per pixel of every buffer in this crate.
pub const RGBA_BYTES_PER_PIXEL: usize = 4;

/// Read access to a framebuffer.
///
/// `Send` so a decode can run inside a spawned task.
pub trait PixelBuffer: Send {
    /// `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Rows covering `rect`, starting at its top-left pixel.
    ///
    /// `stride` receives the row stride in pixels. Returns `None` when the
    /// rectangle is out of bounds.
    fn get_buffer(&self, rect: Rect, stride: &mut usize) -> Option<&[u8]>;
}

/// Write access used by the decoders.
pub trait MutablePixelBuffer: PixelBuffer {
    /// Copy RGBA pixels into `dest`. A `stride` of 0 means tightly packed.
    ///
    /// # Errors
    ///
    /// Fails when `dest` is out of bounds or `pixels` is too short.
    fn image_rect(&mut self, dest: Rect, pixels: &[u8], stride: usize) -> Result<()>;

    /// Copy the area at `dest + src_offset` onto `dest`, handling overlap.
    ///
    /// # Errors
    ///
    /// Fails when either the source or destination leaves the buffer.
    fn copy_rect(&mut self, dest: Rect, src_offset: Point) -> Result<()>;

    /// Fill `rect` with one RGBA colour.
    fn fill_rect(&mut self, rect: Rect, rgba: [u8; 4]) -> Result<()>;
}
