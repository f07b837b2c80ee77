//! Server pixel formats and conversion to RGBA8.
//!
//! Only **true colour** formats are decoded. A server that insists on a colour
//! map is reported through [`PixelFormat::ensure_decodable`] before any pixel
//! data is touched.
//!
//! To extract a component from a pixel value:
//! 1. Assemble the stored bytes into a u32 using the format's endianness
//! 2. Shift right by the channel's shift and mask with the channel's max
//! 3. Scale to 8-bit: `(component * 255) / channel_max`
//!
//! # Example
//!
//! ```
//! use rfb_pixelbuffer::PixelFormat;
//!
//! let pf = PixelFormat::rgb888();
//! let pixel = [0xCC, 0xBB, 0xAA, 0x00]; // little-endian 0x00AABBCC
//! assert_eq!(pf.to_rgba(&pixel), [0xAA, 0xBB, 0xCC, 0xFF]);
//! assert_eq!(pf.encode_rgba([0xAA, 0xBB, 0xCC, 0xFF]), vec![0xCC, 0xBB, 0xAA, 0x00]);
//! ```

use anyhow::{bail, Result};

/// Decoded view of the 16-byte wire PixelFormat.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: bool,
    pub true_color: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    /// Storage width of one pixel, rounded up to whole bytes.
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bits_per_pixel.div_ceil(8)
    }

    /// Little-endian 32bpp, depth 24, red at bit 16.
    pub fn rgb888() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// Check that rectangles in this format can be converted to RGBA.
    ///
    /// # Errors
    ///
    /// Fails for colour-map formats, for storage sizes other than 8, 16 or
    /// 32 bits, and for shifts that would move a channel outside the pixel.
    pub fn ensure_decodable(&self) -> Result<()> {
        if !self.true_color {
            bail!("colour-map pixel formats are not supported");
        }
        if !matches!(self.bits_per_pixel, 8 | 16 | 32) {
            bail!("unsupported bits per pixel: {}", self.bits_per_pixel);
        }
        for (name, shift) in [
            ("red", self.red_shift),
            ("green", self.green_shift),
            ("blue", self.blue_shift),
        ] {
            if shift >= self.bits_per_pixel {
                bail!(
                    "{} shift {} exceeds {} bits per pixel",
                    name,
                    shift,
                    self.bits_per_pixel
                );
            }
        }
        Ok(())
    }

    /// Convert one stored pixel to `[R, G, B, 255]`.
    ///
    /// Missing trailing bytes read as zero and a zero channel max yields a
    /// zero channel, so malformed formats produce dark pixels, never a panic.
    pub fn to_rgba(&self, pixel: &[u8]) -> [u8; 4] {
        let bpp = self.bytes_per_pixel() as usize;
        let mut value = 0u32;
        if self.big_endian {
            for &byte in pixel.iter().take(bpp) {
                value = (value << 8) | u32::from(byte);
            }
        } else {
            for (i, &byte) in pixel.iter().take(bpp.min(4)).enumerate() {
                value |= u32::from(byte) << (i * 8);
            }
        }

        [
            scale_channel(value, self.red_shift, self.red_max),
            scale_channel(value, self.green_shift, self.green_max),
            scale_channel(value, self.blue_shift, self.blue_max),
            255,
        ]
    }

    /// Encode `[R, G, B, _]` in this format. Alpha is ignored.
    pub fn encode_rgba(&self, rgba: [u8; 4]) -> Vec<u8> {
        let r = (u32::from(rgba[0]) * u32::from(self.red_max)) / 255;
        let g = (u32::from(rgba[1]) * u32::from(self.green_max)) / 255;
        let b = (u32::from(rgba[2]) * u32::from(self.blue_max)) / 255;
        let mut value = shl(r, self.red_shift) | shl(g, self.green_shift) | shl(b, self.blue_shift);

        let bpp = self.bytes_per_pixel() as usize;
        let mut result = vec![0u8; bpp];
        if self.big_endian {
            for i in 0..bpp {
                result[bpp - 1 - i] = (value & 0xFF) as u8;
                value >>= 8;
            }
        } else {
            for item in result.iter_mut() {
                *item = (value & 0xFF) as u8;
                value >>= 8;
            }
        }
        result
    }
}

fn shl(value: u32, shift: u8) -> u32 {
    value.checked_shl(u32::from(shift)).unwrap_or(0)
}

fn scale_channel(value: u32, shift: u8, max: u16) -> u8 {
    if max == 0 {
        return 0;
    }
    let component = value.checked_shr(u32::from(shift)).unwrap_or(0) & u32::from(max);
    ((component * 255) / u32::from(max)) as u8
}

impl From<rfb_protocol::messages::types::PixelFormat> for PixelFormat {
    fn from(pf: rfb_protocol::messages::types::PixelFormat) -> Self {
        Self {
            bits_per_pixel: pf.bits_per_pixel,
            depth: pf.depth,
            big_endian: pf.big_endian != 0,
            true_color: pf.true_color != 0,
            red_max: pf.red_max,
            green_max: pf.green_max,
            blue_max: pf.blue_max,
            red_shift: pf.red_shift,
            green_shift: pf.green_shift,
            blue_shift: pf.blue_shift,
        }
    }
}
