//! One connected, authenticated, initialized RFB session.
//!
//! [`Session::connect`] runs the whole handshake:
//!
//! ```text
//! Unconnected -> VersionExchanged -> SecurityTypeChosen -> [Authenticating]
//!             -> Initialized -> Ready
//! ```
//!
//! Any failure on the way closes the transport before the error is returned,
//! so a half-open or authenticated-but-broken socket never escapes.
//! ScreenGeometry and PixelFormat are taken from ServerInit and never change
//! for the lifetime of the session.

use crate::config::Config;
use crate::errors::RfbClientError;
use crate::framebuffer::{DecoderRegistry, Framebuffer};
use crate::input::ButtonMask;
use crate::protocol;
use crate::transport::{timed, Transport};
use rfb_common::ScreenGeometry;
use rfb_pixelbuffer::{FramebufferImage, PixelFormat};
use rfb_protocol::auth::{self, SecurityResult};
use rfb_protocol::handshake::{self, NegotiatedVersion, SecurityNegotiation};
use rfb_protocol::messages::ServerMessage;
use rfb_protocol::ConnectionState;
use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// What ServerInit told us.
struct ServerParameters {
    version: NegotiatedVersion,
    geometry: ScreenGeometry,
    pixel_format: PixelFormat,
    name: String,
}

pub struct Session<S = TcpStream> {
    transport: Transport<S>,
    version: NegotiatedVersion,
    geometry: ScreenGeometry,
    pixel_format: PixelFormat,
    name: String,
}

impl Session<TcpStream> {
    /// Open a TCP connection and run the full handshake.
    ///
    /// # Errors
    ///
    /// - [`RfbClientError::Config`] for an invalid configuration
    /// - [`RfbClientError::Connection`] / [`RfbClientError::Timeout`] when the
    ///   server is unreachable or goes away
    /// - [`RfbClientError::Protocol`] for version or security mismatches
    /// - [`RfbClientError::Authentication`] when the password is rejected
    pub async fn connect(config: &Config) -> Result<Self, RfbClientError> {
        config.validate()?;
        tracing::info!("Connecting to {}", config.address());
        let transport = Transport::connect_tcp(
            &config.connection.host,
            config.connection.port,
            config.timeout(),
        )
        .await?;
        Self::establish(transport, config).await
    }
}

impl<S: AsyncRead + AsyncWrite> Session<S> {
    /// Run the handshake over an already-open transport.
    ///
    /// The transport is closed before any error is returned.
    pub async fn establish(
        mut transport: Transport<S>,
        config: &Config,
    ) -> Result<Self, RfbClientError> {
        match handshake(&mut transport, config).await {
            Ok(params) => {
                tracing::info!(
                    "Session ready: '{}' {} RFB {} ({}bpp depth {})",
                    params.name,
                    params.geometry,
                    params.version,
                    params.pixel_format.bits_per_pixel,
                    params.pixel_format.depth
                );
                Ok(Self {
                    transport,
                    version: params.version,
                    geometry: params.geometry,
                    pixel_format: params.pixel_format,
                    name: params.name,
                })
            }
            Err(e) => {
                tracing::warn!(
                    "Handshake with {} failed in state {}: {}",
                    transport.peer_address(),
                    transport.state(),
                    e
                );
                transport.close().await;
                Err(e)
            }
        }
    }

    /// The authoritative remote resolution.
    pub fn geometry(&self) -> ScreenGeometry {
        self.geometry
    }

    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    pub fn version(&self) -> NegotiatedVersion {
        self.version
    }

    /// Desktop name from ServerInit.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn peer_address(&self) -> &str {
        self.transport.peer_address()
    }

    fn ensure_ready(&self) -> Result<(), RfbClientError> {
        if self.transport.state().is_ready() {
            Ok(())
        } else {
            Err(RfbClientError::ConnectionClosed)
        }
    }

    /// Send one PointerEvent in remote coordinates.
    pub async fn pointer_event(
        &mut self,
        buttons: ButtonMask,
        x: u16,
        y: u16,
    ) -> Result<(), RfbClientError> {
        self.ensure_ready()?;
        let timeout = self.transport.timeout();
        let out = self.transport.connection().outstream();
        timed(
            timeout,
            "send pointer event",
            protocol::write_pointer_event(out, buttons.bits(), x, y),
        )
        .await
    }

    /// Send one KeyEvent.
    pub async fn key_event(&mut self, keysym: u32, down: bool) -> Result<(), RfbClientError> {
        self.ensure_ready()?;
        let timeout = self.transport.timeout();
        let out = self.transport.connection().outstream();
        timed(
            timeout,
            "send key event",
            protocol::write_key_event(out, keysym, down),
        )
        .await
    }

    /// Request a full, non-incremental update and decode it into an image.
    ///
    /// Bell, ServerCutText and SetColourMapEntries arriving before the update
    /// are consumed and ignored.
    pub async fn capture(&mut self) -> Result<FramebufferImage, RfbClientError> {
        self.ensure_ready()?;
        let timeout = self.transport.timeout();
        let geometry = self.geometry;

        let out = self.transport.connection().outstream();
        timed(
            timeout,
            "send framebuffer update request",
            protocol::write_framebuffer_update_request(
                out,
                false,
                0,
                0,
                geometry.width,
                geometry.height,
            ),
        )
        .await?;

        let count = loop {
            let instream = self.transport.connection().instream();
            match timed(
                timeout,
                "read server message",
                protocol::read_server_message(instream),
            )
            .await?
            {
                ServerMessage::FramebufferUpdate(header) => break header.rectangles,
                other => tracing::debug!("Skipping {:?} while waiting for update", other),
            }
        };

        let mut framebuffer = Framebuffer::new(geometry, self.pixel_format)?;
        let instream = self.transport.connection().instream();
        let applied = bounded(timeout, framebuffer.apply_update_stream(instream, count)).await?;

        let image = framebuffer.into_image();
        tracing::info!(
            "Captured {}x{} from {} rectangle(s), encodings {:?}",
            image.width(),
            image.height(),
            applied,
            image.encodings()
        );
        Ok(image)
    }

    /// Close the session. Idempotent.
    pub async fn close(&mut self) {
        self.transport.close().await;
    }
}

async fn handshake<S: AsyncRead + AsyncWrite>(
    transport: &mut Transport<S>,
    config: &Config,
) -> Result<ServerParameters, RfbClientError> {
    let timeout = transport.timeout();

    let (instream, outstream) = transport.connection().streams();
    let version = timed(
        timeout,
        "version exchange",
        handshake::negotiate_version(instream, outstream),
    )
    .await?;
    transport.connection().set_version(version);
    transport.transition_to(ConnectionState::VersionExchanged)?;
    tracing::debug!("Negotiated RFB {}", version);

    let acceptable = config.acceptable_security_types();
    let (instream, outstream) = transport.connection().streams();
    let negotiation = timed(
        timeout,
        "security negotiation",
        handshake::negotiate_security(instream, outstream, version, &acceptable),
    )
    .await?;
    transport.transition_to(ConnectionState::SecurityTypeChosen)?;
    tracing::debug!("Security type {} chosen", negotiation.security_type());

    if matches!(negotiation, SecurityNegotiation::VncAuth { .. }) {
        transport.transition_to(ConnectionState::Authenticating)?;
    }
    let password = config.password().map(str::as_bytes);
    let (instream, outstream) = transport.connection().streams();
    let result = timed(
        timeout,
        "authentication",
        auth::authenticate(instream, outstream, &negotiation, password, version),
    )
    .await?;
    if let SecurityResult::Failed { code, reason } = result {
        return Err(RfbClientError::Authentication { code, reason });
    }

    let outstream = transport.connection().outstream();
    timed(
        timeout,
        "send ClientInit",
        handshake::send_client_init(outstream, config.session.shared),
    )
    .await?;
    let instream = transport.connection().instream();
    let server_init = timed(timeout, "read ServerInit", handshake::recv_server_init(instream)).await?;
    transport.transition_to(ConnectionState::Initialized)?;

    let geometry = ScreenGeometry::new(
        server_init.framebuffer_width,
        server_init.framebuffer_height,
    );
    let pixel_format = PixelFormat::from(server_init.pixel_format);

    let encodings = DecoderRegistry::with_standard().advertised_encodings();
    let outstream = transport.connection().outstream();
    timed(
        timeout,
        "send SetEncodings",
        protocol::write_set_encodings(outstream, &encodings),
    )
    .await?;
    transport.transition_to(ConnectionState::Ready)?;

    Ok(ServerParameters {
        version,
        geometry,
        pixel_format,
        name: server_init.name,
    })
}

/// Bound a multi-read exchange that already reports client errors.
async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, RfbClientError>
where
    F: Future<Output = Result<T, RfbClientError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RfbClientError::Timeout(timeout))?
}
