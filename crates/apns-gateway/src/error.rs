//! Error types for the apns-gateway crate.
//!
//! Only structural failures surface as `Err`: the connection could not be
//! opened, the error channel produced garbage, or a flush refused to
//! settle. Per-notification outcomes are recorded on their envelopes and
//! polled by the caller.

use std::time::Duration;

use thiserror::Error;

use apns_proto::ProtoError;

/// Structural failures of a gateway connection.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The transport or TLS handshake to the gateway failed.
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectFailed {
        /// Endpoint the connect was aimed at.
        endpoint: String,
        /// What went wrong.
        reason: String,
    },

    /// The connect did not complete within the configured timeout.
    #[error("connection to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Endpoint the connect was aimed at.
        endpoint: String,
        /// The configured timeout.
        timeout: Duration,
    },

    /// The error channel produced bytes that are not a valid error frame.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),

    /// I/O failure while polling the error channel.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Recovery kept re-queueing past the configured pass bound.
    #[error("flush did not settle after {0} recovery passes")]
    UnsettledFlush(usize),
}
