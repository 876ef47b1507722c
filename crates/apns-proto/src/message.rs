//! Notification messages and the factory that builds them.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::certificate::Certificate;
use crate::frame::{self, MAX_PAYLOAD_LEN};
use crate::token::DeviceToken;

/// An immutable push notification bound for one device.
///
/// The payload arrives already assembled; this type only validates its
/// length against the legacy framing limit and encodes the on-wire frame.
#[derive(Debug, Clone)]
pub struct Notification {
    token: DeviceToken,
    payload: Bytes,
    expiration: Option<DateTime<Utc>>,
    certificate: Option<Certificate>,
}

impl Notification {
    /// Create a notification carrying an already-assembled payload.
    #[must_use]
    pub fn new(token: DeviceToken, payload: impl Into<Bytes>) -> Self {
        Self {
            token,
            payload: payload.into(),
            expiration: None,
            certificate: None,
        }
    }

    /// Set the expiration timestamp.
    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Bind the notification to a specific certificate.
    #[must_use]
    pub fn with_certificate(mut self, certificate: Certificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    /// Destination token.
    #[must_use]
    pub const fn token(&self) -> &DeviceToken {
        &self.token
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Expiration, if one was set.
    #[must_use]
    pub const fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Certificate this notification is bound to, if any.
    #[must_use]
    pub const fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Whether the payload fits the legacy framing limit.
    #[must_use]
    pub fn validate_length(&self) -> bool {
        self.payload.len() <= MAX_PAYLOAD_LEN
    }

    /// Encode the on-wire frame for this notification under `identifier`.
    #[must_use]
    pub fn encode(&self, identifier: u32) -> Bytes {
        let expiration = self
            .expiration
            .map_or(0, |ts| u32::try_from(ts.timestamp()).unwrap_or(0));
        frame::encode_push_frame(identifier, expiration, &self.token, &self.payload)
    }
}

/// Builds notifications bound to a default certificate.
#[derive(Debug, Clone)]
pub struct NotificationFactory {
    default_certificate: Certificate,
}

impl NotificationFactory {
    /// Create a factory issuing notifications for `default_certificate`.
    #[must_use]
    pub const fn new(default_certificate: Certificate) -> Self {
        Self {
            default_certificate,
        }
    }

    /// The certificate new notifications are bound to.
    #[must_use]
    pub const fn default_certificate(&self) -> &Certificate {
        &self.default_certificate
    }

    /// Create a notification bound to the factory's default certificate.
    #[must_use]
    pub fn create(&self, token: DeviceToken, payload: impl Into<Bytes>) -> Notification {
        Notification::new(token, payload).with_certificate(self.default_certificate.clone())
    }

    /// Create a notification bound to a different certificate instead.
    #[must_use]
    pub fn create_with_certificate(
        &self,
        token: DeviceToken,
        payload: impl Into<Bytes>,
        certificate: Certificate,
    ) -> Notification {
        Notification::new(token, payload).with_certificate(certificate)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::certificate::Environment;

    fn token() -> DeviceToken {
        DeviceToken::from_bytes([0x11; 32])
    }

    #[test]
    fn payload_at_limit_is_valid() {
        let notification = Notification::new(token(), vec![b'x'; 256]);
        assert!(notification.validate_length());
    }

    #[test]
    fn payload_over_limit_is_invalid() {
        let notification = Notification::new(token(), vec![b'x'; 257]);
        assert!(!notification.validate_length());
    }

    #[test]
    fn encodes_expiration_seconds() {
        let expiration = Utc.timestamp_opt(0x0102_0304, 0).unwrap();
        let notification = Notification::new(token(), &b"{}"[..]).with_expiration(expiration);
        let frame = notification.encode(1);
        assert_eq!(&frame[5..9], &[1, 2, 3, 4]);
    }

    #[test]
    fn missing_expiration_encodes_as_zero() {
        let frame = Notification::new(token(), &b"{}"[..]).encode(1);
        assert_eq!(&frame[5..9], &[0, 0, 0, 0]);
    }

    #[test]
    fn factory_binds_default_certificate() {
        let certificate = Certificate::from_pkcs12(b"default".to_vec(), None, Environment::Sandbox);
        let factory = NotificationFactory::new(certificate.clone());
        let notification = factory.create(token(), &b"{}"[..]);
        assert_eq!(
            notification.certificate().map(Certificate::fingerprint),
            Some(certificate.fingerprint())
        );
    }

    #[test]
    fn factory_override_wins() {
        let default = Certificate::from_pkcs12(b"default".to_vec(), None, Environment::Sandbox);
        let other = Certificate::from_pkcs12(b"other".to_vec(), None, Environment::Sandbox);
        let factory = NotificationFactory::new(default);
        let notification = factory.create_with_certificate(token(), &b"{}"[..], other.clone());
        assert_eq!(
            notification.certificate().map(Certificate::fingerprint),
            Some(other.fingerprint())
        );
    }
}
