//! Envelope tracking for queued notifications.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use apns_proto::{ErrorStatus, Notification};

/// Delivery outcome recorded on an envelope.
///
/// Server-reported status bytes are surfaced verbatim as
/// [`DeliveryStatus::Rejected`]; locally synthesized states occupy a
/// disjoint numeric range (see [`DeliveryStatus::as_code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Queued, nothing written yet.
    Pending,
    /// The frame was fully handed to the transport. Not a delivery
    /// guarantee: the gateway may still reject it asynchronously, at which
    /// point the status becomes `Rejected` or `EarlierError`.
    NoErrors,
    /// Local validation failure; the notification never reached the wire.
    PayloadTooLong,
    /// The transport accepted only part of the frame; a retry envelope was
    /// queued in its place.
    SendFailed,
    /// Written after a rejected notification on the same connection and
    /// therefore silently dropped by the gateway; a retry envelope was
    /// queued in its place.
    EarlierError,
    /// Status byte reported by the gateway in an error frame.
    Rejected(u8),
}

impl DeliveryStatus {
    /// Whether this is a settled state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a retry envelope superseded the one carrying this status.
    #[must_use]
    pub const fn is_superseded(self) -> bool {
        matches!(self, Self::SendFailed | Self::EarlierError)
    }

    /// The named server status, when this is a rejection carrying a
    /// documented byte.
    #[must_use]
    pub const fn server_status(self) -> Option<ErrorStatus> {
        match self {
            Self::Rejected(code) => ErrorStatus::from_code(code),
            _ => None,
        }
    }

    /// Numeric code: server bytes map to 0–255, local states to 256 and up.
    #[must_use]
    pub const fn as_code(self) -> u16 {
        match self {
            Self::NoErrors => 0,
            Self::Rejected(code) => code as u16,
            Self::Pending => 256,
            Self::PayloadTooLong => 257,
            Self::SendFailed => 258,
            Self::EarlierError => 259,
        }
    }
}

#[derive(Debug)]
struct EnvelopeState {
    status: DeliveryStatus,
    retry: Option<Envelope>,
}

/// Tracker for one queued notification.
///
/// Cheap to clone; clones share state, so the handle returned by `queue()`
/// observes the status changes the owning connection makes during
/// `flush()`. Only that connection mutates an envelope.
#[derive(Debug, Clone)]
pub struct Envelope {
    identifier: u32,
    notification: Notification,
    state: Arc<Mutex<EnvelopeState>>,
}

impl Envelope {
    pub(crate) fn new(identifier: u32, notification: Notification) -> Self {
        Self {
            identifier,
            notification,
            state: Arc::new(Mutex::new(EnvelopeState {
                status: DeliveryStatus::Pending,
                retry: None,
            })),
        }
    }

    /// Identifier assigned by the connection; unique within it.
    #[must_use]
    pub const fn identifier(&self) -> u32 {
        self.identifier
    }

    /// The notification this envelope tracks.
    #[must_use]
    pub const fn notification(&self) -> &Notification {
        &self.notification
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> DeliveryStatus {
        self.state.lock().status
    }

    /// The envelope that superseded this one, if a resend occurred.
    #[must_use]
    pub fn retry_envelope(&self) -> Option<Envelope> {
        self.state.lock().retry.clone()
    }

    /// Follow the retry chain forward and return the status of the envelope
    /// that finally settled.
    #[must_use]
    pub fn resolved_status(&self) -> DeliveryStatus {
        let mut current = self.clone();
        loop {
            match current.retry_envelope() {
                Some(next) => current = next,
                None => return current.status(),
            }
        }
    }

    pub(crate) fn set_status(&self, status: DeliveryStatus) {
        self.state.lock().status = status;
    }

    pub(crate) fn supersede(&self, status: DeliveryStatus, retry: Envelope) {
        let mut state = self.state.lock();
        state.status = status;
        state.retry = Some(retry);
    }
}

/// Ordered identifier-keyed store of every envelope a connection issued.
///
/// Identifiers are dense and monotonically increasing from 1, so the table
/// is a vector indexed by `identifier - 1`: O(1) lookup plus in-order
/// traversal from any starting identifier. Entries are never evicted;
/// selective resend needs the whole tail.
#[derive(Debug, Default)]
pub(crate) struct EnvelopeTable {
    entries: Vec<Envelope>,
}

impl EnvelopeTable {
    const BASE: u32 = 1;

    pub fn insert(&mut self, envelope: Envelope) {
        debug_assert_eq!(
            envelope.identifier() as usize,
            self.entries.len() + Self::BASE as usize,
            "identifiers are issued densely in order"
        );
        self.entries.push(envelope);
    }

    pub fn get(&self, identifier: u32) -> Option<&Envelope> {
        identifier
            .checked_sub(Self::BASE)
            .and_then(|index| self.entries.get(index as usize))
    }

    /// Envelopes with identifiers `>= from`, in ascending identifier order.
    pub fn iter_from(&self, from: u32) -> impl Iterator<Item = &Envelope> + '_ {
        let start = (from.saturating_sub(Self::BASE) as usize).min(self.entries.len());
        self.entries[start..].iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use apns_proto::DeviceToken;

    use super::*;

    fn notification() -> Notification {
        Notification::new(DeviceToken::from_bytes([0; 32]), &b"{}"[..])
    }

    #[test]
    fn status_codes_are_disjoint() {
        assert_eq!(DeliveryStatus::NoErrors.as_code(), 0);
        assert_eq!(DeliveryStatus::Rejected(8).as_code(), 8);
        assert_eq!(DeliveryStatus::Rejected(255).as_code(), 255);
        assert_eq!(DeliveryStatus::Pending.as_code(), 256);
        assert_eq!(DeliveryStatus::PayloadTooLong.as_code(), 257);
        assert_eq!(DeliveryStatus::SendFailed.as_code(), 258);
        assert_eq!(DeliveryStatus::EarlierError.as_code(), 259);
    }

    #[test]
    fn rejection_names_documented_statuses() {
        assert_eq!(
            DeliveryStatus::Rejected(8).server_status(),
            Some(ErrorStatus::InvalidToken)
        );
        assert_eq!(DeliveryStatus::Rejected(9).server_status(), None);
        assert_eq!(DeliveryStatus::SendFailed.server_status(), None);
    }

    #[test]
    fn clones_share_status() {
        let envelope = Envelope::new(1, notification());
        let observer = envelope.clone();
        envelope.set_status(DeliveryStatus::NoErrors);
        assert_eq!(observer.status(), DeliveryStatus::NoErrors);
    }

    #[test]
    fn resolved_status_follows_the_chain() {
        let first = Envelope::new(1, notification());
        let second = Envelope::new(2, notification());
        let third = Envelope::new(3, notification());

        third.set_status(DeliveryStatus::NoErrors);
        second.supersede(DeliveryStatus::EarlierError, third);
        first.supersede(DeliveryStatus::SendFailed, second.clone());

        assert_eq!(first.resolved_status(), DeliveryStatus::NoErrors);
        assert_eq!(second.resolved_status(), DeliveryStatus::NoErrors);
        assert!(first.status().is_superseded());
    }

    #[test]
    fn table_lookup_and_order() {
        let mut table = EnvelopeTable::default();
        for id in 1..=5 {
            table.insert(Envelope::new(id, notification()));
        }

        assert_eq!(table.len(), 5);
        assert_eq!(table.get(3).map(Envelope::identifier), Some(3));
        assert_eq!(table.get(6).map(Envelope::identifier), None);
        assert_eq!(table.get(0).map(Envelope::identifier), None);

        let tail: Vec<u32> = table.iter_from(4).map(Envelope::identifier).collect();
        assert_eq!(tail, vec![4, 5]);

        let past_end: Vec<u32> = table.iter_from(9).map(Envelope::identifier).collect();
        assert!(past_end.is_empty());
    }
}
