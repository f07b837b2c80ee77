//! RFB handshake: version exchange, security negotiation and initialization.
//!
//! 1. **Version** - the server sends `"RFB 00X.00Y\n"`, the client echoes the
//!    highest version both sides support (3.3, 3.7 or 3.8).
//! 2. **Security** - on 3.7+ the server offers a list and the client picks one
//!    byte; on 3.3 the server dictates a single u32 type.
//! 3. **Initialization** - ClientInit (shared flag) then ServerInit.
//!
//! Authentication itself lives in [`crate::auth`]. When VNC authentication is
//! chosen this module also reads the 16-byte challenge, so the negotiation
//! result carries everything the authenticator needs.
//!
//! All failures are `std::io::Error`s:
//! - `InvalidData` for a malformed banner
//! - `Unsupported` for a version or security type we cannot speak
//! - `PermissionDenied` when the server refuses the connection with a reason

use crate::auth::CHALLENGE_LEN;
use crate::io::{RfbInStream, RfbOutStream};
use crate::messages::{self, SECURITY_TYPE_INVALID, SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH};
use tokio::io::{AsyncRead, AsyncWrite};

/// Refusal reasons longer than this are rejected as malformed.
const MAX_REASON_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NegotiatedVersion {
    /// Server-dictated security type, no SecurityResult for type None.
    V3_3,
    /// Security type list, still no failure reason strings.
    V3_7,
    /// SecurityResult always sent, failures carry a reason.
    V3_8,
}

impl NegotiatedVersion {
    /// The 12-byte banner the client sends back.
    pub fn banner(self) -> &'static [u8; 12] {
        match self {
            NegotiatedVersion::V3_3 => b"RFB 003.003\n",
            NegotiatedVersion::V3_7 => b"RFB 003.007\n",
            NegotiatedVersion::V3_8 => b"RFB 003.008\n",
        }
    }
}

impl std::fmt::Display for NegotiatedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiatedVersion::V3_3 => write!(f, "3.3"),
            NegotiatedVersion::V3_7 => write!(f, "3.7"),
            NegotiatedVersion::V3_8 => write!(f, "3.8"),
        }
    }
}

/// Parse a server banner and pick the version to speak.
///
/// Minor versions 4-6 are treated as 3.3. Anything above 3.8 within major
/// version 3 (Apple's 003.889, for instance) is answered with 3.8.
pub fn parse_version_banner(banner: &[u8; 12]) -> std::io::Result<NegotiatedVersion> {
    if &banner[0..4] != b"RFB " || banner[7] != b'.' || banner[11] != b'\n' {
        return Err(invalid_banner(banner));
    }
    let major = parse_digits(&banner[4..7]).ok_or_else(|| invalid_banner(banner))?;
    let minor = parse_digits(&banner[8..11]).ok_or_else(|| invalid_banner(banner))?;

    match (major, minor) {
        (3, m) if m >= 8 => Ok(NegotiatedVersion::V3_8),
        (3, 7) => Ok(NegotiatedVersion::V3_7),
        (3, 3..=6) => Ok(NegotiatedVersion::V3_3),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("unsupported RFB version {}.{}", major, minor),
        )),
    }
}

fn parse_digits(digits: &[u8]) -> Option<u32> {
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn invalid_banner(banner: &[u8]) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!(
            "invalid RFB version string: expected 'RFB xxx.yyy\\n', got {:?}",
            String::from_utf8_lossy(banner)
        ),
    )
}

/// Read the server banner and answer with the negotiated version.
pub async fn negotiate_version<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    instream: &mut RfbInStream<R>,
    outstream: &mut RfbOutStream<W>,
) -> std::io::Result<NegotiatedVersion> {
    let banner: [u8; 12] = instream.read_array().await?;
    let negotiated = parse_version_banner(&banner)?;

    outstream.write_bytes(negotiated.banner());
    outstream.flush().await?;

    Ok(negotiated)
}

/// The chosen security type together with what it needs next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityNegotiation {
    None,
    VncAuth { challenge: [u8; CHALLENGE_LEN] },
}

impl SecurityNegotiation {
    pub fn security_type(&self) -> u8 {
        match self {
            SecurityNegotiation::None => SECURITY_TYPE_NONE,
            SecurityNegotiation::VncAuth { .. } => SECURITY_TYPE_VNC_AUTH,
        }
    }
}

/// Pick the first type in `acceptable` (ordered by preference) that the
/// server offered.
pub fn select_security_type(offered: &[u8], acceptable: &[u8]) -> Option<u8> {
    acceptable
        .iter()
        .copied()
        .find(|candidate| offered.contains(candidate))
}

/// Negotiate the security type.
///
/// `acceptable` lists the types the caller is willing to use, most preferred
/// first. Only [`SECURITY_TYPE_NONE`] and [`SECURITY_TYPE_VNC_AUTH`] are
/// understood; anything else in the list is ignored.
pub async fn negotiate_security<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    instream: &mut RfbInStream<R>,
    outstream: &mut RfbOutStream<W>,
    version: NegotiatedVersion,
    acceptable: &[u8],
) -> std::io::Result<SecurityNegotiation> {
    let acceptable: Vec<u8> = acceptable
        .iter()
        .copied()
        .filter(|t| *t == SECURITY_TYPE_NONE || *t == SECURITY_TYPE_VNC_AUTH)
        .collect();

    let chosen = match version {
        NegotiatedVersion::V3_3 => {
            let offered = instream.read_u32().await?;
            if offered == u32::from(SECURITY_TYPE_INVALID) {
                return Err(read_refusal(instream).await);
            }
            match u8::try_from(offered) {
                Ok(t) if acceptable.contains(&t) => t,
                _ => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        format!(
                            "server requires security type {} which is not acceptable (accepting {:?})",
                            offered, acceptable
                        ),
                    ))
                }
            }
        }
        NegotiatedVersion::V3_7 | NegotiatedVersion::V3_8 => {
            let count = instream.read_u8().await?;
            if count == 0 {
                return Err(read_refusal(instream).await);
            }
            let offered = instream.read_vec(count as usize).await?;
            let chosen = select_security_type(&offered, &acceptable).ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!(
                        "no acceptable security type offered by server (offered {:?}, accepting {:?})",
                        offered, acceptable
                    ),
                )
            })?;
            outstream.write_u8(chosen);
            outstream.flush().await?;
            chosen
        }
    };

    if chosen == SECURITY_TYPE_VNC_AUTH {
        let challenge = instream.read_array::<CHALLENGE_LEN>().await?;
        Ok(SecurityNegotiation::VncAuth { challenge })
    } else {
        Ok(SecurityNegotiation::None)
    }
}

async fn read_refusal<R: AsyncRead + Unpin>(instream: &mut RfbInStream<R>) -> std::io::Error {
    match instream.read_length_prefixed(MAX_REASON_LEN).await {
        Ok(reason) => std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!(
                "server refused the connection: {}",
                String::from_utf8_lossy(&reason)
            ),
        ),
        Err(e) => e,
    }
}

/// Send ClientInit message to the server.
pub async fn send_client_init<W: AsyncWrite + Unpin>(
    outstream: &mut RfbOutStream<W>,
    shared: bool,
) -> std::io::Result<()> {
    let client_init = messages::ClientInit { shared };
    client_init.write_to(outstream);
    outstream.flush().await
}

/// Receive ServerInit message from the server.
pub async fn recv_server_init<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
) -> std::io::Result<messages::ServerInit> {
    messages::ServerInit::read_from(instream).await
}
