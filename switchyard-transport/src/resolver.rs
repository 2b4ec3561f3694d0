use std::sync::Arc;

use switchyard_common::{ConfigScope, config, internal};
use tokio::sync::OnceCell;

use crate::{
    channel::SharedChannel,
    error::{DispatchError, Result},
    locator::{DirectoryLocator, DirectoryObject},
    session::Session,
};

/// Finds a channel's delegate by name, once.
///
/// The delegate name is read from `mail.<protocol>.delegate` and looked up
/// through the locator named by `mail.<protocol>.locatorClass`. The first
/// successful lookup is kept for the lifetime of the resolver, even if the
/// directory entry changes afterwards. Concurrent first callers wait on the
/// single lookup in flight; a failed lookup is not kept, so the next call
/// tries again.
#[derive(Debug)]
pub struct DelegateResolver {
    name_key: String,
    session: Session,
    locator: Arc<dyn DirectoryLocator>,
    delegate: OnceCell<SharedChannel>,
}

impl DelegateResolver {
    /// # Errors
    /// If the configured locator cannot be created.
    pub fn new(session: &Session, protocol: &str) -> Result<Self> {
        let locator_id = session.scope().get(&config::key(protocol, "locatorClass"));
        let locator = session.registry().locators().create(locator_id)?;

        Ok(Self {
            name_key: config::key(protocol, "delegate"),
            session: session.clone(),
            locator,
            delegate: OnceCell::new(),
        })
    }

    /// The delegate, if it has already been resolved.
    #[must_use]
    pub fn resolved(&self) -> Option<&SharedChannel> {
        self.delegate.get()
    }

    /// The delegate, resolving it on first use.
    ///
    /// # Errors
    /// [`DispatchError::ConfigMissing`] without a delegate name,
    /// [`DispatchError::DelegateNotFound`] if nothing usable is bound to it,
    /// or the locator's own failure.
    #[tracing::instrument(level = "trace", skip_all, fields(key = %self.name_key))]
    pub async fn resolve(&self) -> Result<&SharedChannel> {
        self.delegate.get_or_try_init(|| self.lookup()).await
    }

    async fn lookup(&self) -> Result<SharedChannel> {
        let name = self.session.scope().require(&self.name_key)?;
        internal!(level = DEBUG, "Looking up delegate {name}");

        let object = self
            .locator
            .lookup(name)
            .await?
            .ok_or_else(|| DispatchError::DelegateNotFound(name.to_string()))?;

        let channel = self.channel_from(&object, name)?;
        internal!(
            level = DEBUG,
            "Resolved delegate {name} to {}",
            channel.identity()
        );
        Ok(channel)
    }

    fn channel_from(&self, object: &DirectoryObject, name: &str) -> Result<SharedChannel> {
        if let Some(channel) = object.downcast_ref::<SharedChannel>() {
            Ok(Arc::clone(channel))
        } else if let Some(session) = object.downcast_ref::<Session>() {
            session.channel()
        } else if let Some(scope) = object.downcast_ref::<ConfigScope>() {
            self.session.child(scope.clone()).channel()
        } else {
            Err(DispatchError::DelegateNotFound(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelRegistry, channels::TestChannel, locator::MemoryLocator};

    fn session(locator: &MemoryLocator) -> Session {
        let mut registry = ChannelRegistry::with_defaults();
        registry
            .locators_mut()
            .register_instance("memory", Arc::new(locator.clone()));

        let scope: ConfigScope = [
            ("mail.named.delegate", "target"),
            ("mail.named.locatorClass", "memory"),
        ]
        .into_iter()
        .collect();
        Session::new(scope, Arc::new(registry))
    }

    #[tokio::test]
    async fn test_resolves_bound_channel_once() {
        let locator = MemoryLocator::new();
        let target: SharedChannel = Arc::new(TestChannel::new("mock"));
        locator.bind_channel("target", target.clone());

        let resolver = DelegateResolver::new(&session(&locator), "named").unwrap();
        assert!(resolver.resolved().is_none());

        let first = Arc::clone(resolver.resolve().await.unwrap());
        let second = Arc::clone(resolver.resolve().await.unwrap());

        assert!(Arc::ptr_eq(&first, &target));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(locator.lookups(), 1);
    }

    #[tokio::test]
    async fn test_resolves_scope_through_child_session() {
        let locator = MemoryLocator::new();
        locator.bind(
            "target",
            ConfigScope::new().with(config::TRANSPORT_PROTOCOL, "null"),
        );

        let resolver = DelegateResolver::new(&session(&locator), "named").unwrap();
        let channel = resolver.resolve().await.unwrap();
        assert_eq!(channel.identity().protocol(), "null");
    }

    #[tokio::test]
    async fn test_unrecognised_object_is_not_found() {
        let locator = MemoryLocator::new();
        locator.bind("target", String::from("not a channel"));

        let resolver = DelegateResolver::new(&session(&locator), "named").unwrap();
        assert!(matches!(
            resolver.resolve().await,
            Err(DispatchError::DelegateNotFound(name)) if name == "target"
        ));
    }

    #[tokio::test]
    async fn test_missing_name_is_a_config_error() {
        let locator = MemoryLocator::new();
        let parent = session(&locator);
        let session = parent.child(ConfigScope::new().with("mail.named.locatorClass", "memory"));

        let resolver = DelegateResolver::new(&session, "named").unwrap();
        assert!(matches!(
            resolver.resolve().await,
            Err(DispatchError::ConfigMissing(key)) if key == "mail.named.delegate"
        ));
        assert_eq!(locator.lookups(), 0);
    }
}
