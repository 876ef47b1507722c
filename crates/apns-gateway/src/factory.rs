//! Connection construction seam.

use apns_proto::Certificate;

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::tls::TlsGatewayConnector;

/// Builds the connections a sender pools.
///
/// Injected so tests can hand out connections whose socket is an
/// in-memory script; see the `testing` module.
pub trait GatewayFactory: Send + Sync {
    /// Build a (not yet connected) connection for `certificate`.
    fn build(&self, certificate: Certificate) -> Connection;
}

/// Production factory: TLS connections to the Apple gateways.
#[derive(Debug, Clone, Default)]
pub struct TlsGatewayFactory {
    config: ConnectionConfig,
}

impl TlsGatewayFactory {
    /// Create a factory with default timing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with custom timing.
    #[must_use]
    pub const fn with_config(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

impl GatewayFactory for TlsGatewayFactory {
    fn build(&self, certificate: Certificate) -> Connection {
        Connection::new(
            certificate,
            Box::new(TlsGatewayConnector::new()),
            self.config.clone(),
        )
    }
}
