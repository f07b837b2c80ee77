//! VNC authentication (security type 2) and the SecurityResult exchange.
//!
//! The server sends a 16-byte challenge. The client answers with the challenge
//! encrypted under DES-ECB, as two independent 8-byte blocks. The key is the
//! password truncated or zero-padded to 8 bytes with the bit order of every
//! byte reversed, which is the historical VNC key convention.
//!
//! The result is a u32: 0 is success, 1 is failure, and 2 means too many
//! attempts (3.3 and 3.7 only). RFB 3.8 follows a failure with a reason
//! string.

use crate::handshake::{NegotiatedVersion, SecurityNegotiation};
use crate::io::{RfbInStream, RfbOutStream};
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, KeyInit};
use des::Des;
use tokio::io::{AsyncRead, AsyncWrite};

pub const CHALLENGE_LEN: usize = 16;

/// Failure reasons longer than this are rejected as malformed.
const MAX_REASON_LEN: usize = 64 * 1024;

/// Outcome of the SecurityResult message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityResult {
    Ok,
    Failed { code: u32, reason: Option<String> },
}

impl SecurityResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, SecurityResult::Ok)
    }
}

/// Derive the DES key from a password.
pub fn make_des_key(password: &[u8]) -> [u8; 8] {
    let mut key = [0u8; 8];
    for (slot, byte) in key.iter_mut().zip(password.iter()) {
        *slot = byte.reverse_bits();
    }
    key
}

/// Compute the 16-byte response for a challenge.
pub fn vnc_auth_response(password: &[u8], challenge: &[u8; CHALLENGE_LEN]) -> [u8; CHALLENGE_LEN] {
    let cipher = Des::new(&GenericArray::from(make_des_key(password)));
    let mut response = *challenge;
    for block in response.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    response
}

/// Run the authentication step for whatever security type was negotiated.
///
/// For `None` there is nothing to send; RFB 3.8 still reports a
/// SecurityResult, earlier versions go straight to initialization.
pub async fn authenticate<R: AsyncRead + Unpin, W: AsyncWrite + Unpin>(
    instream: &mut RfbInStream<R>,
    outstream: &mut RfbOutStream<W>,
    negotiation: &SecurityNegotiation,
    password: Option<&[u8]>,
    version: NegotiatedVersion,
) -> std::io::Result<SecurityResult> {
    match negotiation {
        SecurityNegotiation::None => {
            if version == NegotiatedVersion::V3_8 {
                read_security_result(instream, version).await
            } else {
                Ok(SecurityResult::Ok)
            }
        }
        SecurityNegotiation::VncAuth { challenge } => {
            let password = password.ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "VNC authentication selected but no password is configured",
                )
            })?;
            outstream.write_bytes(&vnc_auth_response(password, challenge));
            outstream.flush().await?;
            read_security_result(instream, version).await
        }
    }
}

pub async fn read_security_result<R: AsyncRead + Unpin>(
    instream: &mut RfbInStream<R>,
    version: NegotiatedVersion,
) -> std::io::Result<SecurityResult> {
    let code = instream.read_u32().await?;
    if code == 0 {
        return Ok(SecurityResult::Ok);
    }
    let reason = if version == NegotiatedVersion::V3_8 {
        let bytes = instream.read_length_prefixed(MAX_REASON_LEN).await?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        None
    };
    Ok(SecurityResult::Failed { code, reason })
}
