use parking_lot::Mutex;
use switchyard_transport::{
    ConnectionEvent, ConnectionEventKind, ConnectionListener, TransportEvent, TransportEventKind,
    TransportListener,
};

/// Records the kind of every event it is notified of.
#[derive(Default)]
pub struct RecordingListener {
    connection: Mutex<Vec<ConnectionEventKind>>,
    transport: Mutex<Vec<TransportEventKind>>,
}

impl RecordingListener {
    pub fn connection_events(&self) -> Vec<ConnectionEventKind> {
        self.connection.lock().clone()
    }

    pub fn transport_events(&self) -> Vec<TransportEventKind> {
        self.transport.lock().clone()
    }
}

impl ConnectionListener for RecordingListener {
    fn opened(&self, event: &ConnectionEvent) {
        self.connection.lock().push(event.kind);
    }

    fn disconnected(&self, event: &ConnectionEvent) {
        self.connection.lock().push(event.kind);
    }

    fn closed(&self, event: &ConnectionEvent) {
        self.connection.lock().push(event.kind);
    }
}

impl TransportListener for RecordingListener {
    fn message_delivered(&self, event: &TransportEvent) {
        self.transport.lock().push(event.kind);
    }

    fn message_not_delivered(&self, event: &TransportEvent) {
        self.transport.lock().push(event.kind);
    }

    fn message_partially_delivered(&self, event: &TransportEvent) {
        self.transport.lock().push(event.kind);
    }
}
