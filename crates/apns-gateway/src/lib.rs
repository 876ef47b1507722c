//! # apns-gateway
//!
//! Connection machinery for Apple's legacy binary push gateway.
//!
//! The legacy gateway protocol has an unusual failure mode: success is
//! never acknowledged, and when a notification is rejected the gateway
//! reports it exactly once (a 6-byte error frame), then closes the
//! connection, silently dropping every frame sent after the failing one.
//!
//! [`Connection`] owns the recovery machinery: it pipelines frame writes,
//! polls opportunistically for the error frame between sends, keeps a
//! bounded window open after the queue drains, and selectively resends the
//! dropped tail in its original order. [`Sender`] fans notifications out
//! to one connection per certificate fingerprint.
//!
//! Delivery outcomes are recorded on [`Envelope`]s and polled by the
//! caller; only structural failures (connect, protocol corruption) are
//! returned as errors.
//!
//! ```no_run
//! use apns_gateway::Sender;
//! use apns_proto::{Certificate, DeviceToken, Environment, NotificationFactory};
//!
//! # async fn push() -> Result<(), Box<dyn std::error::Error>> {
//! let certificate = Certificate::from_pkcs12_file(
//!     "push-certificate.p12",
//!     Some("passphrase".to_owned()),
//!     Environment::Production,
//! )?;
//! let factory = NotificationFactory::new(certificate.clone());
//! let mut sender = Sender::new(certificate);
//!
//! let token: DeviceToken = "ab".repeat(32).parse()?;
//! let envelope = sender
//!     .send(factory.create(token, &br#"{"aps":{"alert":"hi"}}"#[..]))
//!     .await?;
//! println!("delivery status: {:?}", envelope.resolved_status());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod sender;
pub mod stream;
pub mod testing;
pub mod tls;

pub use config::ConnectionConfig;
pub use connection::Connection;
pub use envelope::{DeliveryStatus, Envelope};
pub use error::GatewayError;
pub use factory::{GatewayFactory, TlsGatewayFactory};
pub use sender::Sender;
pub use stream::{GatewayConnector, GatewayStream};
pub use tls::TlsGatewayConnector;
