use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::RwLock;
use switchyard_common::internal;

use crate::{
    channel::Identity,
    event::{
        ConnectionEvent, ConnectionEventKind, ConnectionListener, TransportEvent,
        TransportListener,
    },
};

/// Connection flag and listener lists shared by every channel that does its
/// own connection bookkeeping.
///
/// Listeners are notified inline, on the task performing the operation.
#[derive(Default)]
pub struct ChannelState {
    connected: AtomicBool,
    connection_listeners: RwLock<Vec<Arc<dyn ConnectionListener>>>,
    transport_listeners: RwLock<Vec<Arc<dyn TransportListener>>>,
}

impl ChannelState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Mark the channel connected and notify `opened`.
    pub fn open(&self, identity: &Identity) {
        self.connected.store(true, Ordering::Release);
        internal!(level = DEBUG, "Connected {identity}");
        self.notify_connection(&ConnectionEvent {
            kind: ConnectionEventKind::Opened,
            identity: identity.clone(),
        });
    }

    /// Mark the channel closed and notify `closed`.
    pub fn close(&self, identity: &Identity) {
        self.connected.store(false, Ordering::Release);
        internal!(level = DEBUG, "Closed {identity}");
        self.notify_connection(&ConnectionEvent {
            kind: ConnectionEventKind::Closed,
            identity: identity.clone(),
        });
    }

    pub fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.connection_listeners.write().push(listener);
    }

    pub fn remove_connection_listener(&self, listener: &Arc<dyn ConnectionListener>) {
        self.connection_listeners
            .write()
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }

    pub fn add_transport_listener(&self, listener: Arc<dyn TransportListener>) {
        self.transport_listeners.write().push(listener);
    }

    pub fn remove_transport_listener(&self, listener: &Arc<dyn TransportListener>) {
        self.transport_listeners
            .write()
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }

    pub fn notify_connection(&self, event: &ConnectionEvent) {
        // Snapshot so a listener may (de)register without deadlocking.
        let listeners = self.connection_listeners.read().clone();
        for listener in &listeners {
            event.dispatch(listener.as_ref());
        }
    }

    pub fn notify_transport(&self, event: &TransportEvent) {
        let listeners = self.transport_listeners.read().clone();
        for listener in &listeners {
            event.dispatch(listener.as_ref());
        }
    }
}

impl fmt::Debug for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelState")
            .field("connected", &self.is_connected())
            .field("connection_listeners", &self.connection_listeners.read().len())
            .field("transport_listeners", &self.transport_listeners.read().len())
            .finish()
    }
}
