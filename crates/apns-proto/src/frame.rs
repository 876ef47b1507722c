//! Binary framing for the legacy provider protocol.
//!
//! Outbound push frames use the enhanced notification format (command 1):
//!
//! ```text
//! +-----+---------------+---------------+---------+-----------+---------+---------+
//! | cmd | identifier    | expiration    | tok len | token     | pay len | payload |
//! | 1B  | 4B big-endian | 4B big-endian | 2B BE   | 32 bytes  | 2B BE   | <= 256B |
//! +-----+---------------+---------------+---------+-----------+---------+---------+
//! ```
//!
//! The gateway never acknowledges success. Failure arrives as a single
//! 6-byte error-response frame (command 8, status byte, rejected
//! identifier), after which the gateway closes the connection.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtoError;
use crate::token::{DeviceToken, TOKEN_LEN};

/// Command byte of an outbound push frame.
pub const PUSH_COMMAND: u8 = 1;

/// Command byte of an inbound error-response frame.
pub const ERROR_COMMAND: u8 = 8;

/// Size of a complete error-response frame.
pub const ERROR_FRAME_LEN: usize = 6;

/// Maximum payload size the legacy framing accepts.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Encode one push frame.
///
/// `expiration` is epoch seconds, with 0 meaning "do not store".
#[must_use]
pub fn encode_push_frame(
    identifier: u32,
    expiration: u32,
    token: &DeviceToken,
    payload: &[u8],
) -> Bytes {
    debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);

    let mut buf = BytesMut::with_capacity(1 + 4 + 4 + 2 + TOKEN_LEN + 2 + payload.len());
    buf.put_u8(PUSH_COMMAND);
    buf.put_u32(identifier);
    buf.put_u32(expiration);
    #[allow(clippy::cast_possible_truncation)] // TOKEN_LEN is 32
    buf.put_u16(TOKEN_LEN as u16);
    buf.put_slice(token.as_bytes());
    #[allow(clippy::cast_possible_truncation)] // validated against MAX_PAYLOAD_LEN
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
    buf.freeze()
}

/// A decoded error-response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Status byte reported by the gateway.
    pub status: u8,
    /// Identifier of the rejected notification.
    pub identifier: u32,
}

impl ErrorResponse {
    /// Create an error response.
    #[must_use]
    pub const fn new(status: u8, identifier: u32) -> Self {
        Self { status, identifier }
    }

    /// Decode a complete 6-byte error frame.
    ///
    /// # Errors
    ///
    /// [`ProtoError::TruncatedErrorFrame`] if fewer than six bytes were
    /// supplied, [`ProtoError::CorruptErrorFrame`] if the command byte is
    /// not 8.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtoError> {
        if frame.len() < ERROR_FRAME_LEN {
            return Err(ProtoError::TruncatedErrorFrame(frame.len()));
        }
        if frame[0] != ERROR_COMMAND {
            return Err(ProtoError::CorruptErrorFrame(frame[0]));
        }
        let identifier = u32::from_be_bytes([frame[2], frame[3], frame[4], frame[5]]);
        Ok(Self {
            status: frame[1],
            identifier,
        })
    }

    /// Encode this frame. Gateways send these; the client side only needs
    /// encoding for its test doubles.
    #[must_use]
    pub const fn encode(&self) -> [u8; ERROR_FRAME_LEN] {
        let id = self.identifier.to_be_bytes();
        [ERROR_COMMAND, self.status, id[0], id[1], id[2], id[3]]
    }
}
