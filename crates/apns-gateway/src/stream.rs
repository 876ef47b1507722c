//! Transport seams: the socket trait object and the connector that opens it.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use apns_proto::Certificate;

use crate::error::GatewayError;

/// The byte stream a connection drives.
///
/// Anything async-readable and async-writable qualifies; production hands
/// out TLS streams, tests hand out scripted in-memory ones.
pub trait GatewayStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> GatewayStream for T {}

/// Opens transport streams to the gateway a certificate points at.
///
/// Production uses `TlsGatewayConnector`; the `testing` module substitutes
/// a connector handing out scripted streams and counting connects.
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    /// Open a stream to the certificate's gateway endpoint.
    ///
    /// # Errors
    ///
    /// [`GatewayError::ConnectFailed`] when the transport or handshake is
    /// refused. Timeouts are enforced by the calling connection.
    async fn connect(
        &self,
        certificate: &Certificate,
    ) -> Result<Box<dyn GatewayStream>, GatewayError>;
}
