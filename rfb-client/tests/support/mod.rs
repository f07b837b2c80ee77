//! Scripted RFB server on 127.0.0.1 for the integration tests.

#![allow(dead_code)]

use rfb_client::Config;
use rfb_protocol::auth::vnc_auth_response;
use rfb_protocol::messages::types::PixelFormat as WirePixelFormat;
use rfb_protocol::messages::{ClientMessage, ServerInit};
use rfb_protocol::{RfbInStream, RfbOutStream};
use std::future::Future;
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const CHALLENGE: [u8; 16] = *b"0123456789abcdef";

/// The server side of one accepted connection.
pub struct Peer {
    pub input: RfbInStream<OwnedReadHalf>,
    pub output: RfbOutStream<OwnedWriteHalf>,
}

impl Peer {
    async fn version(&mut self) {
        self.output.write_bytes(b"RFB 003.008\n");
        self.output.flush().await.unwrap();
        let banner: [u8; 12] = self.input.read_array().await.unwrap();
        assert_eq!(&banner, b"RFB 003.008\n");
    }

    async fn init(&mut self, width: u16, height: u16) {
        let _shared = self.input.read_u8().await.unwrap();
        ServerInit {
            framebuffer_width: width,
            framebuffer_height: height,
            pixel_format: WirePixelFormat::rgb888(),
            name: "mock desktop".to_string(),
        }
        .write_to(&mut self.output);
        self.output.flush().await.unwrap();

        match self.next_message().await {
            Some(ClientMessage::SetEncodings(_)) => {}
            other => panic!("expected SetEncodings, got {other:?}"),
        }
    }

    /// 3.8 with security type None, through SetEncodings.
    pub async fn handshake_none(&mut self, width: u16, height: u16) {
        self.version().await;
        self.output.write_bytes(&[1, 1]);
        self.output.flush().await.unwrap();
        assert_eq!(self.input.read_u8().await.unwrap(), 1);
        self.output.write_u32(0);
        self.output.flush().await.unwrap();
        self.init(width, height).await;
    }

    /// 3.8 with VNC authentication up to and including the result.
    ///
    /// Returns whether the client's response matched `password`.
    pub async fn vnc_auth(&mut self, password: &[u8], result_code: u32) -> bool {
        self.version().await;
        self.output.write_bytes(&[2, 1, 2]);
        self.output.flush().await.unwrap();
        assert_eq!(self.input.read_u8().await.unwrap(), 2);

        self.output.write_bytes(&CHALLENGE);
        self.output.flush().await.unwrap();
        let response: [u8; 16] = self.input.read_array().await.unwrap();
        let matched = response == vnc_auth_response(password, &CHALLENGE);

        self.output.write_u32(result_code);
        if result_code != 0 {
            let reason = b"authentication failed";
            self.output.write_u32(reason.len() as u32);
            self.output.write_bytes(reason);
        }
        self.output.flush().await.unwrap();
        matched
    }

    pub async fn finish_init(&mut self, width: u16, height: u16) {
        self.init(width, height).await;
    }

    /// Next client PDU, or `None` once the client hangs up.
    pub async fn next_message(&mut self) -> Option<ClientMessage> {
        ClientMessage::read_from(&mut self.input).await.ok()
    }

    /// Every PDU the client sends until it closes the connection.
    pub async fn drain(mut self) -> Vec<ClientMessage> {
        let mut messages = Vec::new();
        while let Some(m) = self.next_message().await {
            messages.push(m);
        }
        messages
    }

    /// True when the client has closed its end.
    pub async fn sees_eof(&mut self) -> bool {
        self.input.read_u8().await.is_err()
    }

    /// Answer a FramebufferUpdateRequest with one rectangle header.
    pub async fn expect_update_request(&mut self) -> (u16, u16) {
        match self.next_message().await {
            Some(ClientMessage::FramebufferUpdateRequest(req)) => {
                assert!(!req.incremental);
                (req.width, req.height)
            }
            other => panic!("expected FramebufferUpdateRequest, got {other:?}"),
        }
    }

    pub fn write_update_header(&mut self, rectangles: u16) {
        self.output.write_u8(0);
        self.output.write_u8(0);
        self.output.write_u16(rectangles);
    }

    pub fn write_rect_header(&mut self, x: u16, y: u16, w: u16, h: u16, encoding: i32) {
        for v in [x, y, w, h] {
            self.output.write_u16(v);
        }
        self.output.write_i32(encoding);
    }
}

/// Bind 127.0.0.1:0, accept one connection and hand it to `script`.
pub async fn spawn_server<F, Fut, T>(script: F) -> (u16, JoinHandle<T>)
where
    F: FnOnce(Peer) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, write) = stream.into_split();
        script(Peer {
            input: RfbInStream::new(read),
            output: RfbOutStream::new(write),
        })
        .await
    });
    (port, task)
}

pub fn config(port: u16, password: Option<&str>) -> Config {
    let mut builder = Config::builder()
        .host("127.0.0.1")
        .port(port)
        .timeout(Duration::from_secs(2));
    if let Some(password) = password {
        builder = builder.password(password);
    }
    builder.build().unwrap()
}
