//! # apns-proto
//!
//! Wire protocol types for the legacy APNS binary provider interface.
//!
//! This crate provides the pieces a gateway connection consumes:
//!
//! - [`DeviceToken`]: the 32-byte destination token
//! - [`Notification`]: an immutable message plus its binary framing
//! - [`Certificate`]: the opaque client identity connections are pooled by
//! - [`ErrorResponse`]: the 6-byte failure frame the gateway reports with
//! - [`ErrorStatus`]: the well-known status bytes carried in that frame
//!
//! The connection machinery itself lives in `apns-gateway`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod certificate;
pub mod error;
pub mod frame;
pub mod message;
pub mod status;
pub mod token;

pub use certificate::{Certificate, Endpoint, EndpointKind, Environment};
pub use error::ProtoError;
pub use frame::{
    encode_push_frame, ErrorResponse, ERROR_COMMAND, ERROR_FRAME_LEN, MAX_PAYLOAD_LEN,
    PUSH_COMMAND,
};
pub use message::{Notification, NotificationFactory};
pub use status::ErrorStatus;
pub use token::{DeviceToken, TOKEN_LEN};
