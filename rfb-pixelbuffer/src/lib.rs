//! RFB pixel buffer types and utilities.
//!
//! Server pixel formats, the RGBA buffer decoders write into, and the
//! immutable image a capture produces.

pub mod buffer;
pub mod format;
pub mod image;
pub mod managed;

pub use buffer::{MutablePixelBuffer, PixelBuffer};
pub use format::PixelFormat;
pub use image::FramebufferImage;
pub use managed::ManagedPixelBuffer;
