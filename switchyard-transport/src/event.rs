//! Connection and delivery notifications.

use switchyard_common::Address;

use crate::channel::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventKind {
    Opened,
    Disconnected,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub identity: Identity,
}

impl ConnectionEvent {
    pub(crate) fn dispatch(&self, listener: &dyn ConnectionListener) {
        match self.kind {
            ConnectionEventKind::Opened => listener.opened(self),
            ConnectionEventKind::Disconnected => listener.disconnected(self),
            ConnectionEventKind::Closed => listener.closed(self),
        }
    }
}

/// Observes a channel opening and closing.
pub trait ConnectionListener: Send + Sync {
    fn opened(&self, _event: &ConnectionEvent) {}

    fn disconnected(&self, _event: &ConnectionEvent) {}

    fn closed(&self, _event: &ConnectionEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEventKind {
    Delivered,
    NotDelivered,
    PartiallyDelivered,
}

/// The outcome of handing one message to a terminal channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub kind: TransportEventKind,
    pub message_id: Option<String>,
    pub delivered: Vec<Address>,
    pub undelivered: Vec<Address>,
}

impl TransportEvent {
    #[must_use]
    pub fn delivered(message_id: Option<&str>, recipients: &[Address]) -> Self {
        Self {
            kind: TransportEventKind::Delivered,
            message_id: message_id.map(str::to_string),
            delivered: recipients.to_vec(),
            undelivered: Vec::new(),
        }
    }

    #[must_use]
    pub fn not_delivered(message_id: Option<&str>, recipients: &[Address]) -> Self {
        Self {
            kind: TransportEventKind::NotDelivered,
            message_id: message_id.map(str::to_string),
            delivered: Vec::new(),
            undelivered: recipients.to_vec(),
        }
    }

    pub(crate) fn dispatch(&self, listener: &dyn TransportListener) {
        match self.kind {
            TransportEventKind::Delivered => listener.message_delivered(self),
            TransportEventKind::NotDelivered => listener.message_not_delivered(self),
            TransportEventKind::PartiallyDelivered => listener.message_partially_delivered(self),
        }
    }
}

/// Observes delivery outcomes.
pub trait TransportListener: Send + Sync {
    fn message_delivered(&self, _event: &TransportEvent) {}

    fn message_not_delivered(&self, _event: &TransportEvent) {}

    fn message_partially_delivered(&self, _event: &TransportEvent) {}
}
