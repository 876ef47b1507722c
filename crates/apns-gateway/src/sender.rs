//! Fan-out of notifications to per-certificate connections.

use std::collections::HashMap;

use tracing::debug;

use apns_proto::{Certificate, Notification};

use crate::connection::Connection;
use crate::envelope::Envelope;
use crate::error::GatewayError;
use crate::factory::{GatewayFactory, TlsGatewayFactory};

/// Sends notifications through a lazily populated pool of per-certificate
/// connections.
///
/// Certificate fingerprints are the sole identity test: two certificates
/// with the same fingerprint share a connection. Connections live for the
/// sender's lifetime. Callers sharing a sender across tasks serialize
/// access themselves.
pub struct Sender {
    default_certificate: Certificate,
    factory: Box<dyn GatewayFactory>,
    connections: HashMap<String, Connection>,
}

impl Sender {
    /// Create a sender pushing through TLS gateway connections.
    #[must_use]
    pub fn new(default_certificate: Certificate) -> Self {
        Self::with_factory(default_certificate, Box::new(TlsGatewayFactory::new()))
    }

    /// Create a sender with an injected connection factory.
    #[must_use]
    pub fn with_factory(
        default_certificate: Certificate,
        factory: Box<dyn GatewayFactory>,
    ) -> Self {
        Self {
            default_certificate,
            factory,
            connections: HashMap::new(),
        }
    }

    /// Queue one notification and immediately flush its connection.
    ///
    /// The notification goes to the connection for its own certificate, or
    /// the sender's default when it has none.
    ///
    /// # Errors
    ///
    /// Structural connection failures; the delivery outcome itself is on
    /// the returned envelope.
    pub async fn send(&mut self, notification: Notification) -> Result<Envelope, GatewayError> {
        let connection = self.connection_for(notification.certificate());
        let envelope = connection.queue(notification);
        connection.flush().await?;
        Ok(envelope)
    }

    /// Queue a notification on its connection without flushing.
    pub fn queue(&mut self, notification: Notification) -> Envelope {
        let connection = self.connection_for(notification.certificate());
        connection.queue(notification)
    }

    /// Flush every known connection.
    ///
    /// # Errors
    ///
    /// Returns the first structural failure; the remaining connections
    /// keep their queues for a later flush.
    pub async fn flush(&mut self) -> Result<(), GatewayError> {
        for connection in self.connections.values_mut() {
            connection.flush().await?;
        }
        Ok(())
    }

    /// Total queued envelopes across all connections.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.connections.values().map(Connection::queue_len).sum()
    }

    /// Number of connections the pool has created so far.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn connection_for(&mut self, certificate: Option<&Certificate>) -> &mut Connection {
        let certificate = certificate.unwrap_or(&self.default_certificate).clone();
        let factory = &self.factory;
        self.connections
            .entry(certificate.fingerprint().to_owned())
            .or_insert_with(|| {
                debug!(
                    fingerprint = certificate.fingerprint(),
                    "creating connection"
                );
                factory.build(certificate)
            })
    }
}
