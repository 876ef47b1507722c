//! Connection timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing knobs for a gateway connection.
///
/// The inter-send delay and the post-drain window exist because the
/// gateway signals failure asynchronously and unsolicited: a short pause
/// between frames lets the kernel buffer drain, and the window after the
/// queue empties gives a trailing error frame a chance to land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Timeout covering TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Pause between consecutive frame writes.
    pub inter_send_delay: Duration,
    /// How long to wait for a trailing error frame after the queue drains.
    pub post_drain_window: Duration,
    /// Upper bound on drain passes within one flush; recovery re-enters
    /// the drain, and exceeding the bound aborts with an error.
    pub max_recovery_passes: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            inter_send_delay: Duration::from_millis(10),
            post_drain_window: Duration::from_secs(1),
            max_recovery_passes: 16,
        }
    }
}

impl ConnectionConfig {
    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the pause between frame writes.
    #[must_use]
    pub const fn with_inter_send_delay(mut self, delay: Duration) -> Self {
        self.inter_send_delay = delay;
        self
    }

    /// Set the post-drain wait for trailing error frames.
    #[must_use]
    pub const fn with_post_drain_window(mut self, window: Duration) -> Self {
        self.post_drain_window = window;
        self
    }

    /// Set the recovery pass bound.
    #[must_use]
    pub const fn with_max_recovery_passes(mut self, passes: usize) -> Self {
        self.max_recovery_passes = passes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.inter_send_delay, Duration::from_millis(10));
        assert_eq!(config.post_drain_window, Duration::from_secs(1));
        assert_eq!(config.max_recovery_passes, 16);
    }

    #[test]
    fn builders_override() {
        let config = ConnectionConfig::default()
            .with_connect_timeout(Duration::from_secs(5))
            .with_inter_send_delay(Duration::from_millis(1))
            .with_post_drain_window(Duration::from_millis(100))
            .with_max_recovery_passes(4);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.inter_send_delay, Duration::from_millis(1));
        assert_eq!(config.post_drain_window, Duration::from_millis(100));
        assert_eq!(config.max_recovery_passes, 4);
    }
}
