//! Protocol message helpers for sending/receiving RFB messages.
//!
//! Thin wrappers over `rfb_protocol::messages` that add the optional
//! protocol trace and flush after every PDU, so each client message reaches
//! the socket as one write. Errors stay `io::Error` here; callers wrap each
//! exchange in [`crate::transport::timed`] to bound it and classify failures.

use crate::protocol_trace;
use rfb_protocol::io::{RfbInStream, RfbOutStream};
use rfb_protocol::messages::{self as msg, ServerMessage};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// Read the next server message.
///
/// For a FramebufferUpdate only the header is consumed; the rectangles
/// follow on the stream.
pub async fn read_server_message<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> io::Result<ServerMessage> {
    let message = ServerMessage::read_from(instream).await?;
    if protocol_trace::enabled() {
        match &message {
            ServerMessage::FramebufferUpdate(h) => {
                protocol_trace::in_msg("FramebufferUpdate", &format!("rects={}", h.rectangles))
            }
            ServerMessage::SetColourMapEntries(m) => protocol_trace::in_msg(
                "SetColourMapEntries",
                &format!("first={} colours={}", m.first_colour, m.colours),
            ),
            ServerMessage::Bell => protocol_trace::in_msg("Bell", ""),
            ServerMessage::ServerCutText(m) => {
                protocol_trace::in_msg("ServerCutText", &format!("len={}", m.text.len()))
            }
        }
    }
    Ok(message)
}

/// Write SetEncodings with preferred encoding order and flush.
pub async fn write_set_encodings<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    encodings: &[i32],
) -> io::Result<()> {
    let msg = msg::SetEncodings {
        encodings: encodings.to_vec(),
    };
    protocol_trace::out_msg("SetEncodings", &format!("{:?}", msg.encodings));
    tracing::debug!("Wrote SetEncodings: {:?}", msg.encodings);
    msg.write_to(outstream);
    outstream.flush().await
}

/// Write a FramebufferUpdateRequest and flush.
pub async fn write_framebuffer_update_request<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    incremental: bool,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) -> io::Result<()> {
    let msg = msg::FramebufferUpdateRequest {
        incremental,
        x,
        y,
        width,
        height,
    };
    protocol_trace::out_msg(
        "FramebufferUpdateRequest",
        &format!("inc={} rect=({},{} {}x{})", incremental, x, y, width, height),
    );
    msg.write_to(outstream);
    outstream.flush().await
}

/// Write a KeyEvent (press or release) and flush.
pub async fn write_key_event<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    key: u32,
    down: bool,
) -> io::Result<()> {
    let msg = msg::KeyEvent { down, key };
    protocol_trace::out_msg("KeyEvent", &format!("down={} key=0x{:X}", down, key));
    msg.write_to(outstream);
    outstream.flush().await
}

/// Write a PointerEvent (mouse) and flush.
pub async fn write_pointer_event<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    button_mask: u8,
    x: u16,
    y: u16,
) -> io::Result<()> {
    let msg = msg::PointerEvent { button_mask, x, y };
    protocol_trace::out_msg(
        "PointerEvent",
        &format!("buttons=0x{:02X} pos=({}, {})", button_mask, x, y),
    );
    msg.write_to(outstream);
    outstream.flush().await
}
