//! Rectangle decoders for RFB framebuffer updates.
//!
//! A decoder reads one rectangle's payload from the stream, converts pixels
//! from the server's format to RGBA and writes them into a
//! [`MutablePixelBuffer`].
//!
//! - **Async decoding**: decoders read from a tokio-backed [`RfbInStream`]
//! - **Exact framing**: a decoder consumes exactly its rectangle's bytes, or fails
//! - **Encoding types**: each decoder handles one i32 encoding identifier
//!
//! Supported encodings:
//!
//! - [`ENCODING_RAW`] (0): uncompressed pixels
//! - [`ENCODING_COPYRECT`] (1): copy from another region of the same update
//!
//! Pseudo-encodings (negative values) carry no pixels:
//!
//! - [`ENCODING_LAST_RECT`] (-224): ends the update early
//! - [`ENCODING_DESKTOP_SIZE`] (-223): resolution change
//!
//! # Example
//!
//! ```no_run
//! use rfb_encodings::{Decoder, RawDecoder, ENCODING_RAW};
//!
//! let decoder = RawDecoder;
//! assert_eq!(decoder.encoding_type(), ENCODING_RAW);
//! ```

use anyhow::Result;
use tokio::io::AsyncRead;

pub use rfb_pixelbuffer::{MutablePixelBuffer, PixelFormat};
pub use rfb_protocol::io::RfbInStream;
pub use rfb_protocol::messages::types::{
    Rectangle, ENCODING_COPYRECT, ENCODING_DESKTOP_SIZE, ENCODING_LAST_RECT, ENCODING_RAW,
};

pub mod raw;
pub use raw::RawDecoder;

pub mod copyrect;
pub use copyrect::CopyRectDecoder;

/// Human-readable name for log lines and error messages.
pub fn encoding_name(encoding: i32) -> &'static str {
    match encoding {
        ENCODING_RAW => "Raw",
        ENCODING_COPYRECT => "CopyRect",
        2 => "RRE",
        5 => "Hextile",
        6 => "Zlib",
        7 => "Tight",
        15 => "TRLE",
        16 => "ZRLE",
        ENCODING_LAST_RECT => "LastRect",
        ENCODING_DESKTOP_SIZE => "DesktopSize",
        _ => "unknown",
    }
}

/// Core trait for rectangle decoders.
///
/// Implementors must read exactly the bytes of one rectangle and fail with a
/// clear error on short or malformed data. There is no fallback path.
#[allow(async_fn_in_trait)]
pub trait Decoder {
    /// The `ENCODING_*` identifier this decoder handles.
    fn encoding_type(&self) -> i32;

    /// Decode a single rectangle from the input stream into the pixel buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is short (EOF), the rectangle does not
    /// fit the buffer, or the encoding-specific data is invalid.
    async fn decode<R: AsyncRead + Unpin>(
        &self,
        stream: &mut RfbInStream<R>,
        rect: &Rectangle,
        pixel_format: &PixelFormat,
        buffer: &mut dyn MutablePixelBuffer,
    ) -> Result<()>;
}
