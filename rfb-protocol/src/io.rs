//! Buffered big-endian streams for RFB wire traffic.
//!
//! [`RfbInStream`] pulls bytes from any [`AsyncRead`] into an internal
//! [`BytesMut`] and hands out network-order integers, fixed arrays and
//! length-prefixed blobs. [`RfbOutStream`] accumulates a whole PDU in memory
//! and writes it with a single `write_all` on [`RfbOutStream::flush`], so a
//! PDU is never interleaved with another one on the socket.
//!
//! # Examples
//!
//! ```
//! use rfb_protocol::io::{RfbInStream, RfbOutStream};
//!
//! # async fn example() -> std::io::Result<()> {
//! let mut wire = Vec::new();
//! let mut out = RfbOutStream::new(&mut wire);
//! out.write_u8(5);
//! out.write_u8(0);
//! out.write_u16(100);
//! out.write_u16(200);
//! out.flush().await?;
//!
//! let mut input = RfbInStream::new(std::io::Cursor::new(wire));
//! assert_eq!(input.read_u8().await?, 5);
//! input.skip(1).await?;
//! assert_eq!(input.read_u16().await?, 100);
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read side of an RFB connection.
pub struct RfbInStream<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> RfbInStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(16 * 1024),
        }
    }

    /// Fill the buffer until at least `n` bytes are available.
    ///
    /// Fails with `UnexpectedEof` when the peer closes first.
    async fn ensure_bytes(&mut self, n: usize) -> std::io::Result<()> {
        if self.buffer.len() < n {
            self.buffer.reserve(n - self.buffer.len());
        }
        while self.buffer.len() < n {
            let bytes_read = self.reader.read_buf(&mut self.buffer).await?;
            if bytes_read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!(
                        "connection closed: needed {} bytes, only {} buffered",
                        n,
                        self.buffer.len()
                    ),
                ));
            }
        }
        Ok(())
    }

    pub async fn read_u8(&mut self) -> std::io::Result<u8> {
        self.ensure_bytes(1).await?;
        Ok(self.buffer.get_u8())
    }

    pub async fn read_u16(&mut self) -> std::io::Result<u16> {
        self.ensure_bytes(2).await?;
        Ok(self.buffer.get_u16())
    }

    pub async fn read_u32(&mut self) -> std::io::Result<u32> {
        self.ensure_bytes(4).await?;
        Ok(self.buffer.get_u32())
    }

    pub async fn read_i32(&mut self) -> std::io::Result<i32> {
        self.ensure_bytes(4).await?;
        Ok(self.buffer.get_i32())
    }

    /// Fill `buf` completely.
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.ensure_bytes(buf.len()).await?;
        self.buffer.copy_to_slice(buf);
        Ok(())
    }

    pub async fn read_array<const N: usize>(&mut self) -> std::io::Result<[u8; N]> {
        let mut out = [0u8; N];
        self.read_bytes(&mut out).await?;
        Ok(out)
    }

    /// Read exactly `n` bytes into a fresh vector.
    pub async fn read_vec(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        self.ensure_bytes(n).await?;
        Ok(self.buffer.split_to(n).to_vec())
    }

    /// Read a u32 length followed by that many bytes.
    ///
    /// Lengths above `limit` are rejected with `InvalidData` before any
    /// allocation happens.
    pub async fn read_length_prefixed(&mut self, limit: usize) -> std::io::Result<Vec<u8>> {
        let len = self.read_u32().await? as usize;
        if len > limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("length prefix {} exceeds limit {}", len, limit),
            ));
        }
        self.read_vec(len).await
    }

    pub async fn skip(&mut self, n: usize) -> std::io::Result<()> {
        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(64 * 1024);
            self.ensure_bytes(chunk).await?;
            self.buffer.advance(chunk);
            remaining -= chunk;
        }
        Ok(())
    }

    /// Bytes already received but not yet consumed.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }
}

/// Write side of an RFB connection.
pub struct RfbOutStream<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> RfbOutStream<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(256),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Send everything buffered so far and flush the underlying writer.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            let pending = self.buffer.split();
            self.writer.write_all(&pending).await?;
        }
        self.writer.flush().await
    }

    /// Bytes written but not yet flushed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Give back the writer. Unflushed bytes are lost.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Drop anything unflushed and shut the writer down.
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.buffer.clear();
        self.writer.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_integers_big_endian() {
        let data = vec![0x2A, 0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF, 0xFF, 0xFF, 0xFF, 0x20];
        let mut stream = RfbInStream::new(Cursor::new(data));

        assert_eq!(stream.read_u8().await.unwrap(), 0x2A);
        assert_eq!(stream.read_u16().await.unwrap(), 0x1234);
        assert_eq!(stream.read_u32().await.unwrap(), 0xDEAD_BEEF);
        assert_eq!(stream.read_i32().await.unwrap(), -224);
    }

    #[tokio::test]
    async fn test_read_array_and_vec() {
        let data = b"RFB 003.008\nabc".to_vec();
        let mut stream = RfbInStream::new(Cursor::new(data));

        let banner: [u8; 12] = stream.read_array().await.unwrap();
        assert_eq!(&banner, b"RFB 003.008\n");
        assert_eq!(stream.read_vec(3).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_read_length_prefixed() {
        let mut data = vec![0, 0, 0, 5];
        data.extend_from_slice(b"hello");
        let mut stream = RfbInStream::new(Cursor::new(data));
        assert_eq!(stream.read_length_prefixed(16).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_read_length_prefixed_over_limit() {
        let data = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let mut stream = RfbInStream::new(Cursor::new(data));
        let err = stream.read_length_prefixed(1024).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_skip_large() {
        let mut data = vec![0u8; 200_000];
        data.push(7);
        let mut stream = RfbInStream::new(Cursor::new(data));
        stream.skip(200_000).await.unwrap();
        assert_eq!(stream.read_u8().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_short_read_is_eof() {
        let mut stream = RfbInStream::new(Cursor::new(vec![1, 2, 3]));
        let mut buf = [0u8; 4];
        let err = stream.read_bytes(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_write_then_flush() {
        let mut buffer = Vec::new();
        let mut stream = RfbOutStream::new(&mut buffer);

        stream.write_u8(4);
        stream.write_u8(1);
        stream.write_u16(0);
        stream.write_u32(0xffe3);
        assert_eq!(stream.buffered(), 8);
        stream.flush().await.unwrap();
        assert_eq!(stream.buffered(), 0);

        assert_eq!(buffer, vec![4, 1, 0, 0, 0x00, 0x00, 0xFF, 0xE3]);
    }

    #[tokio::test]
    async fn test_write_i32_negative() {
        let mut buffer = Vec::new();
        let mut stream = RfbOutStream::new(&mut buffer);
        stream.write_i32(-223);
        stream.flush().await.unwrap();
        assert_eq!(buffer, vec![0xFF, 0xFF, 0xFF, 0x21]);
    }
}
