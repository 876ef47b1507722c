//! In-memory gateway doubles for tests.
//!
//! [`MockGateway`] scripts a gateway conversation: which reads become
//! available after how many completed writes (optionally after an extra
//! delay, to model the gateway's asynchronous failure reporting), and
//! which writes are cut short. The factory and connector it hands out
//! share one state cell, so tests can assert on connects, builds and the
//! exact bytes each write accepted.

use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use apns_proto::{Certificate, EndpointKind, ErrorResponse};

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::GatewayError;
use crate::factory::GatewayFactory;
use crate::stream::{GatewayConnector, GatewayStream};

/// One scripted read: `bytes` become readable once `after_writes` write
/// calls completed and `delay` has elapsed since the threshold was
/// crossed.
#[derive(Debug)]
struct ScriptedRead {
    after_writes: usize,
    delay: Duration,
    bytes: Vec<u8>,
    armed_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct MockState {
    connects: usize,
    builds: usize,
    writes: Vec<Vec<u8>>,
    short_writes: HashSet<usize>,
    reads: Vec<ScriptedRead>,
    next_read: usize,
    read_waker: Option<Waker>,
    fail_connects: bool,
}

/// A scripted in-memory gateway.
///
/// Cheap to clone; clones share the script and the counters.
#[derive(Debug, Clone)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
    config: ConnectionConfig,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    /// Create a gateway with test-speed timing (1 ms inter-send pause,
    /// 50 ms post-drain window).
    #[must_use]
    pub fn new() -> Self {
        let config = ConnectionConfig::default()
            .with_connect_timeout(Duration::from_secs(1))
            .with_inter_send_delay(Duration::from_millis(1))
            .with_post_drain_window(Duration::from_millis(50));
        Self {
            state: Arc::default(),
            config,
        }
    }

    /// Use custom connection timing.
    #[must_use]
    pub fn with_config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Cut the `nth` write (0-based) short by one byte.
    pub fn short_write_on(&self, nth: usize) {
        self.state.lock().short_writes.insert(nth);
    }

    /// Script an error frame that becomes readable once `after_writes`
    /// writes completed.
    pub fn error_frame_after(&self, after_writes: usize, status: u8, identifier: u32) {
        self.read_after(
            after_writes,
            ErrorResponse::new(status, identifier).encode().to_vec(),
        );
    }

    /// Script an error frame that becomes readable `delay` after the
    /// write threshold was crossed, matching the shape of the gateway's
    /// trailing error report.
    pub fn error_frame_delayed(
        &self,
        after_writes: usize,
        delay: Duration,
        status: u8,
        identifier: u32,
    ) {
        self.read_delayed(
            after_writes,
            delay,
            ErrorResponse::new(status, identifier).encode().to_vec(),
        );
    }

    /// Script raw bytes that become readable once `after_writes` writes
    /// completed.
    pub fn read_after(&self, after_writes: usize, bytes: Vec<u8>) {
        self.read_delayed(after_writes, Duration::ZERO, bytes);
    }

    /// Script raw bytes readable `delay` after the write threshold.
    pub fn read_delayed(&self, after_writes: usize, delay: Duration, bytes: Vec<u8>) {
        self.state.lock().reads.push(ScriptedRead {
            after_writes,
            delay,
            bytes,
            armed_at: None,
        });
    }

    /// Make every subsequent connect attempt fail.
    pub fn fail_connects(&self) {
        self.state.lock().fail_connects = true;
    }

    /// Number of socket connects performed.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Number of connections built through the factory.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.state.lock().builds
    }

    /// Bytes accepted by each write call, in order.
    #[must_use]
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// A factory handing out connections wired to this script.
    #[must_use]
    pub fn factory(&self) -> MockGatewayFactory {
        MockGatewayFactory {
            gateway: self.clone(),
        }
    }

    /// Build one connection directly, bypassing the factory counter.
    #[must_use]
    pub fn connection(&self, certificate: Certificate) -> Connection {
        Connection::new(
            certificate,
            Box::new(MockConnector {
                state: Arc::clone(&self.state),
            }),
            self.config.clone(),
        )
    }
}

/// Factory counting builds and wiring the scripted stream in.
#[derive(Debug, Clone)]
pub struct MockGatewayFactory {
    gateway: MockGateway,
}

impl GatewayFactory for MockGatewayFactory {
    fn build(&self, certificate: Certificate) -> Connection {
        self.gateway.state.lock().builds += 1;
        self.gateway.connection(certificate)
    }
}

#[derive(Debug)]
struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl GatewayConnector for MockConnector {
    async fn connect(
        &self,
        certificate: &Certificate,
    ) -> Result<Box<dyn GatewayStream>, GatewayError> {
        {
            let mut state = self.state.lock();
            if state.fail_connects {
                return Err(GatewayError::ConnectFailed {
                    endpoint: certificate.endpoint(EndpointKind::Gateway).to_string(),
                    reason: "scripted connect failure".to_owned(),
                });
            }
            state.connects += 1;
        }
        Ok(Box::new(MockStream {
            state: Arc::clone(&self.state),
        }))
    }
}

/// The scripted stream itself. Reads block until their script entry is
/// due; writes always complete, possibly short.
#[derive(Debug)]
struct MockStream {
    state: Arc<Mutex<MockState>>,
}

impl AsyncRead for MockStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let state = &mut *this.state.lock();

        let written = state.writes.len();
        let next = state.next_read;
        if let Some(read) = state.reads.get_mut(next) {
            if written >= read.after_writes {
                let armed_at = *read.armed_at.get_or_insert_with(Instant::now);
                let elapsed = armed_at.elapsed();
                if elapsed >= read.delay {
                    let take = read.bytes.len().min(buf.remaining());
                    buf.put_slice(&read.bytes[..take]);
                    read.bytes.drain(..take);
                    if read.bytes.is_empty() {
                        state.next_read += 1;
                    }
                    return Poll::Ready(Ok(()));
                }
                // Not due yet: arrange a wake when the delay elapses.
                let waker = cx.waker().clone();
                let remaining = read.delay - elapsed;
                tokio::spawn(async move {
                    tokio::time::sleep(remaining).await;
                    waker.wake();
                });
                return Poll::Pending;
            }
        }

        state.read_waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let state = &mut *this.state.lock();

        let index = state.writes.len();
        let accept = if state.short_writes.contains(&index) {
            buf.len().saturating_sub(1)
        } else {
            buf.len()
        };
        state.writes.push(buf[..accept].to_vec());

        // A newly crossed write threshold may unblock a parked reader.
        if let Some(waker) = state.read_waker.take() {
            waker.wake();
        }
        Poll::Ready(Ok(accept))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use apns_proto::Environment;

    use super::*;

    fn certificate() -> Certificate {
        Certificate::from_pkcs12(b"mock".to_vec(), None, Environment::Sandbox)
    }

    #[tokio::test]
    async fn logs_writes_and_counts_connects() {
        let gateway = MockGateway::new();
        let connector = MockConnector {
            state: Arc::clone(&gateway.state),
        };

        let mut stream = connector.connect(&certificate()).await.unwrap();
        stream.write(b"hello").await.unwrap();

        assert_eq!(gateway.connect_count(), 1);
        assert_eq!(gateway.write_log(), vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn short_write_accepts_one_byte_less() {
        let gateway = MockGateway::new();
        gateway.short_write_on(0);
        let connector = MockConnector {
            state: Arc::clone(&gateway.state),
        };

        let mut stream = connector.connect(&certificate()).await.unwrap();
        let written = stream.write(b"hello").await.unwrap();

        assert_eq!(written, 4);
        assert_eq!(gateway.write_log(), vec![b"hell".to_vec()]);
    }

    #[tokio::test]
    async fn scripted_read_waits_for_write_threshold() {
        let gateway = MockGateway::new();
        gateway.read_after(1, vec![1, 2, 3]);
        let connector = MockConnector {
            state: Arc::clone(&gateway.state),
        };

        let mut stream = connector.connect(&certificate()).await.unwrap();
        stream.write(b"x").await.unwrap();

        let mut buf = [0u8; 8];
        let read = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..read], &[1, 2, 3]);
    }
}
