use std::{collections::HashMap, fmt, sync::Arc};

use switchyard_common::internal;

use crate::{
    channel::{Identity, SharedChannel, shared},
    channels::{
        DelegatingChannel, ErrorChannel, FileChannel, NamedChannel, NullChannel,
        RecipientOverrideChannel, TimeoutChannel,
    },
    error::{DispatchError, Result},
    locator::LocatorRegistry,
    session::Session,
};

/// Builds a channel for a session.
pub type Provider = Arc<dyn Fn(&Session, Identity) -> Result<SharedChannel> + Send + Sync>;

/// Maps protocol names to the providers that build their channels, and
/// locator identifiers to the locators named channels resolve through.
#[derive(Default)]
pub struct ChannelRegistry {
    providers: HashMap<String, Provider>,
    locators: LocatorRegistry,
}

impl ChannelRegistry {
    /// An empty registry. Only the default locator is available.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry providing every built-in channel.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with_provider(NullChannel::PROTOCOL, |_, identity| {
                Ok(shared(NullChannel::new(identity)))
            })
            .with_provider(FileChannel::PROTOCOL, |session, identity| {
                FileChannel::new(session, identity).map(shared)
            })
            .with_provider(ErrorChannel::PROTOCOL, |session, identity| {
                ErrorChannel::new(session, identity).map(shared)
            })
            .with_provider(TimeoutChannel::PROTOCOL, |session, identity| {
                TimeoutChannel::new(session, identity).map(shared)
            })
            .with_provider(DelegatingChannel::PROTOCOL, |session, identity| {
                DelegatingChannel::new(session, identity).map(shared)
            })
            .with_provider(NamedChannel::PROTOCOL, |session, identity| {
                NamedChannel::new(session, identity).map(shared)
            })
            .with_provider(RecipientOverrideChannel::PROTOCOL, |session, identity| {
                RecipientOverrideChannel::new(session, identity).map(shared)
            })
    }

    /// Register `provider` for `protocol`, replacing any previous provider.
    pub fn register<F>(&mut self, protocol: impl Into<String>, provider: F)
    where
        F: Fn(&Session, Identity) -> Result<SharedChannel> + Send + Sync + 'static,
    {
        let protocol = protocol.into();
        internal!(level = DEBUG, "Registering channel provider for {protocol}");
        self.providers.insert(protocol, Arc::new(provider));
    }

    #[must_use]
    pub fn with_provider<F>(mut self, protocol: impl Into<String>, provider: F) -> Self
    where
        F: Fn(&Session, Identity) -> Result<SharedChannel> + Send + Sync + 'static,
    {
        self.register(protocol, provider);
        self
    }

    /// Hand out `channel` itself whenever `protocol` is requested.
    pub fn register_channel(&mut self, protocol: impl Into<String>, channel: SharedChannel) {
        self.register(protocol, move |_, _| Ok(Arc::clone(&channel)));
    }

    #[must_use]
    pub const fn locators(&self) -> &LocatorRegistry {
        &self.locators
    }

    pub const fn locators_mut(&mut self) -> &mut LocatorRegistry {
        &mut self.locators
    }

    #[must_use]
    pub fn contains(&self, protocol: &str) -> bool {
        self.providers.contains_key(protocol)
    }

    /// Build the channel for `identity`'s protocol.
    ///
    /// # Errors
    /// [`DispatchError::UnknownProtocol`] if no provider is registered, or
    /// whatever the provider fails with.
    pub fn create(&self, session: &Session, identity: Identity) -> Result<SharedChannel> {
        let provider = self
            .providers
            .get(identity.protocol())
            .ok_or_else(|| DispatchError::UnknownProtocol(identity.protocol().to_string()))?;

        internal!("Creating channel {identity}");
        provider(session, identity)
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut protocols: Vec<_> = self.providers.keys().collect();
        protocols.sort();

        f.debug_struct("ChannelRegistry")
            .field("protocols", &protocols)
            .field("locators", &self.locators)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use switchyard_common::ConfigScope;

    use super::*;
    use crate::channels::TestChannel;

    #[test]
    fn test_defaults_cover_builtin_protocols() {
        let registry = ChannelRegistry::with_defaults();
        for protocol in ["null", "file", "error", "timeout", "delegating", "named", "rcpt"] {
            assert!(registry.contains(protocol), "missing {protocol}");
        }
        assert!(!registry.contains("smtp"));
    }

    #[test]
    fn test_registered_channel_is_shared() {
        let channel = Arc::new(TestChannel::new("mock"));
        let mut registry = ChannelRegistry::new();
        registry.register_channel("mock", channel.clone());

        let session = Session::new(ConfigScope::new(), Arc::new(registry));
        let created = session.channel_for("mock").unwrap();

        assert_eq!(created.identity().protocol(), "mock");
        assert_eq!(Arc::strong_count(&channel), 3);
    }
}
