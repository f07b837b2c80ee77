//! Geometry types shared by the RFB automation crates.
//!
//! - [`Point`] - signed 2D offset, used for CopyRect source offsets
//! - [`Rect`] - framebuffer rectangle with position and size
//! - [`ScreenGeometry`] - the remote screen size announced in ServerInit
//! - [`SourceResolution`] - the caller's reference resolution for coordinates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default reference width callers use when they do not say otherwise.
pub const DEFAULT_SOURCE_WIDTH: i32 = 1366;
/// Default reference height callers use when they do not say otherwise.
pub const DEFAULT_SOURCE_HEIGHT: i32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub const fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the whole rectangle lies inside a `width` x `height` surface.
    pub const fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= width as i64 && self.bottom() <= height as i64
    }
}

/// Remote screen size, fixed for the lifetime of a session once ServerInit is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u16,
    pub height: u16,
}

impl ScreenGeometry {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub const fn full_rect(&self) -> Rect {
        Rect::new(0, 0, self.width as u32, self.height as u32)
    }

    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for ScreenGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resolution the caller's coordinates are expressed in.
///
/// Values are signed; zero or negative dimensions are rejected by the scaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceResolution {
    pub width: i32,
    pub height: i32,
}

impl SourceResolution {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl Default for SourceResolution {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_WIDTH, DEFAULT_SOURCE_HEIGHT)
    }
}

impl fmt::Display for SourceResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
