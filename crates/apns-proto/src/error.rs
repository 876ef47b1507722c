//! Error types for the apns-proto crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Device token text form has the wrong length.
    #[error("device token must be 64 hex characters, got {0}")]
    TokenLength(usize),

    /// Device token text form is not valid hex.
    #[error("device token is not valid hex: {0}")]
    TokenEncoding(#[from] hex::FromHexError),

    /// Error frame carried an unexpected command byte.
    #[error("corrupt error frame: expected command 8, got {0}")]
    CorruptErrorFrame(u8),

    /// The stream ended before a complete error frame arrived.
    #[error("truncated error frame: got {0} of 6 bytes")]
    TruncatedErrorFrame(usize),
}
