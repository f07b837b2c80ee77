//! Property tests: PDU parsing must not depend on how TCP segments the bytes.

use super::client::{KeyEvent, PointerEvent};
use super::server::ServerInit;
use super::types::{PixelFormat, Rectangle, ENCODING_COPYRECT, ENCODING_RAW};
use super::ClientMessage;
use crate::io::{RfbInStream, RfbOutStream};
use proptest::prelude::*;

/// Delivers the data in chunks of at most `chunk` bytes per read.
struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl tokio::io::AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let remaining = self.data.len() - self.pos;
        let n = remaining.min(self.chunk).min(buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        std::task::Poll::Ready(Ok(()))
    }
}

fn arbitrary_pixel_format() -> impl Strategy<Value = PixelFormat> {
    (
        prop::sample::select(vec![8u8, 16, 32]),
        prop::bool::ANY,
        prop::sample::select(vec![7u16, 31, 63, 255]),
    )
        .prop_map(|(bpp, big_endian, max)| PixelFormat {
            bits_per_pixel: bpp,
            depth: bpp.min(24),
            big_endian: u8::from(big_endian),
            true_color: 1,
            red_max: max,
            green_max: max,
            blue_max: max,
            red_shift: 0,
            green_shift: bpp / 3,
            blue_shift: 2 * bpp / 3,
        })
}

fn arbitrary_client_message() -> impl Strategy<Value = ClientMessage> {
    prop_oneof![
        (any::<u8>(), any::<u16>(), any::<u16>()).prop_map(|(button_mask, x, y)| {
            ClientMessage::PointerEvent(PointerEvent { button_mask, x, y })
        }),
        (any::<bool>(), any::<u32>())
            .prop_map(|(down, key)| ClientMessage::KeyEvent(KeyEvent { down, key })),
    ]
}

proptest! {
    #[test]
    fn server_init_survives_fragmentation(
        width in 1u16..=7680,
        height in 1u16..=4320,
        pixel_format in arbitrary_pixel_format(),
        name in "[a-zA-Z0-9 ]{0,64}",
        chunk in 1usize..40,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let init = ServerInit {
                framebuffer_width: width,
                framebuffer_height: height,
                pixel_format,
                name,
            };
            let mut buffer = Vec::new();
            let mut out = RfbOutStream::new(&mut buffer);
            init.write_to(&mut out);
            out.flush().await.unwrap();

            let mut input = RfbInStream::new(ChunkedReader { data: buffer, pos: 0, chunk });
            let parsed = ServerInit::read_from(&mut input).await.unwrap();
            prop_assert_eq!(init, parsed);
            Ok(())
        })?;
    }

    #[test]
    fn input_pdus_survive_fragmentation(
        messages in prop::collection::vec(arbitrary_client_message(), 1..20),
        chunk in 1usize..16,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let mut buffer = Vec::new();
            let mut out = RfbOutStream::new(&mut buffer);
            for message in &messages {
                message.write_to(&mut out);
            }
            out.flush().await.unwrap();

            let mut input = RfbInStream::new(ChunkedReader { data: buffer, pos: 0, chunk });
            for expected in &messages {
                let parsed = ClientMessage::read_from(&mut input).await.unwrap();
                prop_assert_eq!(expected, &parsed);
            }
            prop_assert_eq!(input.available(), 0);
            Ok(())
        })?;
    }

    #[test]
    fn rectangle_headers_survive_fragmentation(
        x in any::<u16>(),
        y in any::<u16>(),
        width in any::<u16>(),
        height in any::<u16>(),
        encoding in prop::sample::select(vec![ENCODING_RAW, ENCODING_COPYRECT, 5, 16, -239]),
        chunk in 1usize..12,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let rect = Rectangle { x, y, width, height, encoding };
            let mut buffer = Vec::new();
            let mut out = RfbOutStream::new(&mut buffer);
            rect.write_to(&mut out);
            out.flush().await.unwrap();

            let mut input = RfbInStream::new(ChunkedReader { data: buffer, pos: 0, chunk });
            prop_assert_eq!(rect, Rectangle::read_from(&mut input).await.unwrap());
            Ok(())
        })?;
    }
}
