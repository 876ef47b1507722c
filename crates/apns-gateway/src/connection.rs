//! A stateful connection to one gateway, multiplexed by identifier.
//!
//! The legacy gateway never acknowledges success. When a notification is
//! rejected it reports the failure once (a 6-byte error frame naming the
//! rejected identifier), then half-closes the connection and silently
//! drops every frame sent after the failing one. The flush loop here
//! therefore pipelines writes, polls for the error frame between sends,
//! and on failure re-queues the dropped tail in its original order under
//! fresh identifiers.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, trace, warn};

use apns_proto::{Certificate, EndpointKind, ErrorResponse, Notification, ERROR_FRAME_LEN};

use crate::config::ConnectionConfig;
use crate::envelope::{DeliveryStatus, Envelope, EnvelopeTable};
use crate::error::GatewayError;
use crate::stream::{GatewayConnector, GatewayStream};

/// A connection to one gateway.
///
/// Owns the socket, the send queue, the identifier counter and the table
/// of every envelope it ever issued (required for selective resend; the
/// table is never trimmed). Not safe for concurrent use: all methods take
/// `&mut self` and callers serialize access.
pub struct Connection {
    certificate: Certificate,
    connector: Box<dyn GatewayConnector>,
    config: ConnectionConfig,
    socket: Option<Box<dyn GatewayStream>>,
    last_identifier: u32,
    in_flight: EnvelopeTable,
    send_queue: VecDeque<Envelope>,
    frame_buf: Vec<u8>,
}

impl Connection {
    /// Create a connection for `certificate`. The socket opens lazily
    /// before the first write.
    #[must_use]
    pub fn new(
        certificate: Certificate,
        connector: Box<dyn GatewayConnector>,
        config: ConnectionConfig,
    ) -> Self {
        Self {
            certificate,
            connector,
            config,
            socket: None,
            last_identifier: 0,
            in_flight: EnvelopeTable::default(),
            send_queue: VecDeque::new(),
            frame_buf: Vec::new(),
        }
    }

    /// The certificate this connection authenticates with.
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Whether a socket is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Number of envelopes awaiting a write.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.send_queue.len()
    }

    /// Number of envelopes ever issued by this connection.
    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Assign the next identifier and queue `notification` for delivery.
    ///
    /// The envelope enters the in-flight table before anything else.
    /// Oversized payloads are recorded as
    /// [`DeliveryStatus::PayloadTooLong`] and never enter the send queue;
    /// the envelope is returned either way.
    pub fn queue(&mut self, notification: Notification) -> Envelope {
        self.last_identifier += 1;
        let envelope = Envelope::new(self.last_identifier, notification);
        self.in_flight.insert(envelope.clone());

        if envelope.notification().validate_length() {
            self.send_queue.push_back(envelope.clone());
            trace!(
                identifier = envelope.identifier(),
                queued = self.send_queue.len(),
                "queued notification"
            );
        } else {
            envelope.set_status(DeliveryStatus::PayloadTooLong);
            warn!(
                identifier = envelope.identifier(),
                size = envelope.notification().payload().len(),
                "payload too long, not queued"
            );
        }
        envelope
    }

    /// Open the socket to the certificate's gateway endpoint. No-op when
    /// already connected.
    ///
    /// # Errors
    ///
    /// [`GatewayError::ConnectFailed`] or [`GatewayError::ConnectTimeout`]
    /// on transport or handshake failure.
    pub async fn connect(&mut self) -> Result<(), GatewayError> {
        if self.socket.is_some() {
            return Ok(());
        }
        let endpoint = self.certificate.endpoint(EndpointKind::Gateway);
        debug!(
            %endpoint,
            fingerprint = self.certificate.fingerprint(),
            "connecting"
        );
        let stream = match timeout(
            self.config.connect_timeout,
            self.connector.connect(&self.certificate),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(GatewayError::ConnectTimeout {
                    endpoint: endpoint.to_string(),
                    timeout: self.config.connect_timeout,
                });
            }
        };
        self.socket = Some(stream);
        Ok(())
    }

    /// Close the socket if one is open. Always safe to call.
    pub async fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.shutdown().await;
            debug!(
                fingerprint = self.certificate.fingerprint(),
                "disconnected"
            );
        }
    }

    /// Drain the send queue.
    ///
    /// Writes are pipelined with a short pause between frames, and after
    /// each frame the socket is polled for an error frame. Once the queue
    /// is empty, a bounded window stays open for a trailing error frame.
    /// Recovery re-queues the dropped tail, so the drain re-enters until
    /// the queue stays empty and the window stays quiet. Flushing an empty
    /// queue is a no-op with zero socket I/O.
    ///
    /// # Errors
    ///
    /// Structural failures only: connect failures, corrupt error frames,
    /// I/O errors on the error channel, or exceeding the recovery pass
    /// bound. Per-notification outcomes are recorded on the envelopes. A
    /// failed flush leaves the connection disconnected with the in-flight
    /// table intact.
    pub async fn flush(&mut self) -> Result<(), GatewayError> {
        if self.send_queue.is_empty() {
            return Ok(());
        }

        let mut passes = 0usize;
        loop {
            passes += 1;
            if passes > self.config.max_recovery_passes {
                return Err(GatewayError::UnsettledFlush(passes - 1));
            }

            while let Some(envelope) = self.send_queue.pop_front() {
                // Cancellation / signal dispatch point between frames; a
                // frame write itself is a single await and cannot be
                // interrupted mid-frame.
                tokio::task::yield_now().await;

                if let Err(err) = self.send_envelope(&envelope).await {
                    // Still pending: put it back so a later flush retries it.
                    self.send_queue.push_front(envelope);
                    return Err(err);
                }
                tokio::time::sleep(self.config.inter_send_delay).await;

                if let Some(frame) = self.poll_error_frame(Duration::ZERO).await? {
                    self.handle_error_frame(&frame);
                }
            }

            match self.poll_error_frame(self.config.post_drain_window).await? {
                Some(frame) => self.handle_error_frame(&frame),
                None => break,
            }
        }

        debug!(
            in_flight = self.in_flight.len(),
            passes, "flush settled"
        );
        Ok(())
    }

    /// Write one frame, recording the outcome on the envelope.
    ///
    /// Short writes and hard write errors both take the transport-failure
    /// path: the envelope is superseded by a fresh one at the queue tail.
    /// Only connect failures abort.
    async fn send_envelope(&mut self, envelope: &Envelope) -> Result<(), GatewayError> {
        let frame = envelope.notification().encode(envelope.identifier());
        self.connect().await?;

        match self.write_frame(&frame).await {
            Ok(written) if written == frame.len() => {
                envelope.set_status(DeliveryStatus::NoErrors);
                trace!(
                    identifier = envelope.identifier(),
                    len = written,
                    "frame written"
                );
            }
            Ok(written) => {
                warn!(
                    identifier = envelope.identifier(),
                    written,
                    expected = frame.len(),
                    "short write, superseding"
                );
                self.requeue(envelope, DeliveryStatus::SendFailed);
            }
            Err(err) => {
                warn!(
                    identifier = envelope.identifier(),
                    error = %err,
                    "write failed, superseding"
                );
                self.socket = None;
                self.requeue(envelope, DeliveryStatus::SendFailed);
            }
        }
        Ok(())
    }

    async fn write_frame(&mut self, frame: &[u8]) -> std::io::Result<usize> {
        match self.socket.as_deref_mut() {
            Some(socket) => {
                let written = socket.write(frame).await?;
                socket.flush().await?;
                Ok(written)
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "socket not open",
            )),
        }
    }

    /// Read the socket for up to `window`, accumulating error-frame bytes
    /// across calls. A zero window is the opportunistic poll between
    /// sends: ready bytes are taken, otherwise the call returns at once.
    async fn poll_error_frame(
        &mut self,
        window: Duration,
    ) -> Result<Option<ErrorResponse>, GatewayError> {
        let deadline = Instant::now() + window;
        loop {
            let Some(socket) = self.socket.as_deref_mut() else {
                return Ok(None);
            };

            let mut chunk = [0u8; ERROR_FRAME_LEN];
            let read = match timeout_at(deadline, socket.read(&mut chunk)).await {
                Ok(Ok(n)) => n,
                Ok(Err(err)) => {
                    self.socket = None;
                    return Err(GatewayError::Io(err));
                }
                Err(_) => return Ok(None), // window elapsed, nothing pending
            };

            if read == 0 {
                // Peer closed. Mid-frame that is corruption; with an empty
                // buffer the socket is simply gone and the next write
                // reconnects.
                self.socket = None;
                if self.frame_buf.is_empty() {
                    return Ok(None);
                }
                let got = self.frame_buf.len();
                self.frame_buf.clear();
                return Err(apns_proto::ProtoError::TruncatedErrorFrame(got).into());
            }

            self.frame_buf.extend_from_slice(&chunk[..read]);
            if self.frame_buf.len() >= ERROR_FRAME_LEN {
                let bytes: Vec<u8> = self.frame_buf.drain(..ERROR_FRAME_LEN).collect();
                return match ErrorResponse::decode(&bytes) {
                    Ok(frame) => {
                        debug!(
                            status = frame.status,
                            identifier = frame.identifier,
                            "error frame received"
                        );
                        Ok(Some(frame))
                    }
                    Err(err) => {
                        self.socket = None;
                        self.frame_buf.clear();
                        Err(err.into())
                    }
                };
            }
        }
    }

    /// Apply the recovery protocol for a received error frame.
    ///
    /// The gateway half-closed after reporting `frame.identifier`; every
    /// frame written after it was dropped. The rejected envelope keeps the
    /// reported status and is never retried. The dropped tail (envelopes
    /// after the rejected one still marked `NoErrors`) is re-queued in
    /// ascending identifier order under fresh identifiers, preserving the
    /// original send order. The socket reopens lazily before the next
    /// write.
    fn handle_error_frame(&mut self, frame: &ErrorResponse) {
        self.socket = None;

        match self.in_flight.get(frame.identifier) {
            Some(envelope) => envelope.set_status(DeliveryStatus::Rejected(frame.status)),
            None => warn!(
                identifier = frame.identifier,
                "error frame names an unknown identifier"
            ),
        }

        let dropped: Vec<Envelope> = self
            .in_flight
            .iter_from(frame.identifier.saturating_add(1))
            .filter(|envelope| envelope.status() == DeliveryStatus::NoErrors)
            .cloned()
            .collect();
        debug!(
            rejected = frame.identifier,
            status = frame.status,
            dropped = dropped.len(),
            "recovering dropped tail"
        );
        for envelope in dropped {
            self.requeue(&envelope, DeliveryStatus::EarlierError);
        }
    }

    fn requeue(&mut self, superseded: &Envelope, status: DeliveryStatus) {
        let retry = self.queue(superseded.notification().clone());
        debug!(
            superseded = superseded.identifier(),
            retry = retry.identifier(),
            status = ?status,
            "superseding envelope"
        );
        superseded.supersede(status, retry);
    }
}
