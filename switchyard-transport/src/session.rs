use std::sync::Arc;

use switchyard_common::{ConfigScope, Signal, config, internal};
use tokio::sync::broadcast;

use crate::{
    channel::{Identity, SharedChannel},
    error::Result,
    registry::ChannelRegistry,
};

/// A configuration scope bound to the registry that turns it into channels.
///
/// Sessions created through [`Session::child`] share the registry and the
/// interrupt signal of their parent, but see only their own configuration.
#[derive(Debug, Clone)]
pub struct Session {
    scope: ConfigScope,
    registry: Arc<ChannelRegistry>,
    interrupt: broadcast::Sender<Signal>,
}

impl Session {
    pub fn new(scope: ConfigScope, registry: Arc<ChannelRegistry>) -> Self {
        let (interrupt, _) = broadcast::channel(4);
        Self {
            scope,
            registry,
            interrupt,
        }
    }

    /// A session over `scope` with every built-in channel available.
    pub fn with_defaults(scope: ConfigScope) -> Self {
        Self::new(scope, Arc::new(ChannelRegistry::with_defaults()))
    }

    #[must_use]
    pub const fn scope(&self) -> &ConfigScope {
        &self.scope
    }

    #[must_use]
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Create the channel selected by `mail.transport.protocol`.
    ///
    /// # Errors
    /// If the protocol is not configured or the channel cannot be built.
    pub fn channel(&self) -> Result<SharedChannel> {
        let protocol = self.scope.require(config::TRANSPORT_PROTOCOL)?;
        self.channel_for(protocol)
    }

    /// Create a channel for `protocol`.
    ///
    /// # Errors
    /// [`crate::DispatchError::UnknownProtocol`] if nothing provides the
    /// protocol, or whatever the provider fails with.
    pub fn channel_for(&self, protocol: &str) -> Result<SharedChannel> {
        let identity = Identity::from_scope(protocol, &self.scope)?;
        self.registry.create(self, identity)
    }

    /// A session over `scope` sharing this session's registry and interrupt.
    #[must_use]
    pub fn child(&self, scope: ConfigScope) -> Self {
        Self {
            scope,
            registry: Arc::clone(&self.registry),
            interrupt: self.interrupt.clone(),
        }
    }

    /// Abandon every simulated wait in progress on channels of this session
    /// and its children.
    pub fn interrupt(&self) {
        match self.interrupt.send(Signal::Shutdown) {
            Ok(waiting) => internal!(level = DEBUG, "Interrupted {waiting} waiting operation(s)"),
            Err(_) => internal!("Interrupt sent with nothing waiting"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.interrupt.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;

    #[test]
    fn test_channel_requires_protocol() {
        let session = Session::with_defaults(ConfigScope::new());
        assert!(matches!(
            session.channel(),
            Err(DispatchError::ConfigMissing(key)) if key == config::TRANSPORT_PROTOCOL
        ));
    }

    #[test]
    fn test_unknown_protocol() {
        let session = Session::with_defaults(
            [(config::TRANSPORT_PROTOCOL, "smtp")].into_iter().collect(),
        );
        assert!(matches!(
            session.channel(),
            Err(DispatchError::UnknownProtocol(protocol)) if protocol == "smtp"
        ));
    }

    #[test]
    fn test_child_shares_interrupt() {
        let parent = Session::with_defaults(ConfigScope::new());
        let child = parent.child(ConfigScope::new().with("mail.user", "child"));
        let mut receiver = child.subscribe();

        parent.interrupt();

        assert_eq!(receiver.try_recv().unwrap(), Signal::Shutdown);
        assert_eq!(child.scope().get("mail.user"), Some("child"));
        assert!(parent.scope().is_empty());
    }
}
