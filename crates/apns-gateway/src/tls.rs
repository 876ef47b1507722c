//! TLS transport to the production gateways.

use async_trait::async_trait;
use native_tls::Identity;
use tokio::net::TcpStream;
use tracing::debug;

use apns_proto::{Certificate, EndpointKind};

use crate::error::GatewayError;
use crate::stream::{GatewayConnector, GatewayStream};

/// Connector that opens a TLS stream to the certificate's gateway endpoint.
///
/// The client identity comes from the certificate's PKCS#12 material. A
/// refused handshake is almost always bad material or a wrong passphrase
/// rather than a network problem, and the error message says so.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsGatewayConnector;

impl TlsGatewayConnector {
    /// Create the connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayConnector for TlsGatewayConnector {
    async fn connect(
        &self,
        certificate: &Certificate,
    ) -> Result<Box<dyn GatewayStream>, GatewayError> {
        let endpoint = certificate.endpoint(EndpointKind::Gateway);

        let identity = Identity::from_pkcs12(
            certificate.identity_der(),
            certificate.passphrase().unwrap_or(""),
        )
        .map_err(|e| GatewayError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason: format!("client identity rejected (check certificate and passphrase): {e}"),
        })?;

        let connector = native_tls::TlsConnector::builder()
            .identity(identity)
            .build()
            .map_err(|e| GatewayError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: format!("failed to build tls context: {e}"),
            })?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let tcp = TcpStream::connect((endpoint.host, endpoint.port))
            .await
            .map_err(|e| GatewayError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: format!("tcp connect failed: {e}"),
            })?;
        tcp.set_nodelay(true)?;
        debug!(%endpoint, "tcp connected, starting tls handshake");

        let tls = connector
            .connect(endpoint.host, tcp)
            .await
            .map_err(|e| GatewayError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: format!("tls handshake failed (check certificate and passphrase): {e}"),
            })?;
        debug!(%endpoint, "tls handshake completed");

        Ok(Box::new(tls))
    }
}
