//! Finished framebuffer capture.

/// An assembled screen capture: RGBA8 pixels, row-major, no padding.
///
/// Immutable once built. Conversion to a file format happens at the caller's
/// boundary, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    encodings: Vec<i32>,
}

impl FramebufferImage {
    pub(crate) fn new(width: u32, height: u32, pixels: Vec<u8>, encodings: Vec<i32>) -> Self {
        Self {
            width,
            height,
            pixels,
            encodings,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.pixels
    }

    /// Distinct encodings that contributed rectangles, in arrival order.
    pub fn encodings(&self) -> &[i32] {
        &self.encodings
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let p = self.pixels.get(offset..offset + 4)?;
        Some([p[0], p[1], p[2], p[3]])
    }
}
