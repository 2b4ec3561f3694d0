use std::sync::Arc;

use async_trait::async_trait;
use switchyard_common::{Address, Message, config, internal};

use crate::{
    channel::{Channel, ConnectParams, Identity, SharedChannel},
    error::{DispatchError, Result},
    event::TransportListener,
    session::Session,
    state::ChannelState,
};

/// Build the channel described by `mail.<protocol>.delegate.*`, if any.
///
/// The subtree is remapped to `mail.*` and handed to a child session, so its
/// own `mail.transport.protocol` picks the channel.
pub(crate) fn embedded_delegate(
    session: &Session,
    protocol: &str,
) -> Result<Option<SharedChannel>> {
    let scope = session.scope().delegate_scope(protocol);
    if scope.is_empty() {
        return Ok(None);
    }

    internal!(
        level = DEBUG,
        "Building embedded delegate for {protocol} from {} key(s)",
        scope.len()
    );
    session.child(scope).channel().map(Some)
}

/// Forwards to a channel built from its own embedded configuration.
///
/// The delegate is created together with this channel, so a broken
/// delegate configuration fails construction rather than the first send.
/// Connection listeners observe this channel opening and closing; transport
/// listeners are registered with the delegate, which is where delivery
/// happens.
#[derive(Debug)]
pub struct DelegatingChannel {
    identity: Identity,
    state: ChannelState,
    delegate: SharedChannel,
}

impl DelegatingChannel {
    pub const PROTOCOL: &'static str = "delegating";

    /// Build a channel delegating to `mail.<protocol>.delegate.*`, where
    /// `protocol` is that of `identity`.
    ///
    /// # Errors
    /// [`DispatchError::ConfigMissing`] if the delegate subtree is empty, or
    /// whatever building the delegate fails with.
    pub fn new(session: &Session, identity: Identity) -> Result<Self> {
        let delegate = embedded_delegate(session, identity.protocol())?.ok_or_else(|| {
            DispatchError::ConfigMissing(format!(
                "{}*",
                config::delegate_prefix(identity.protocol())
            ))
        })?;

        Ok(Self {
            identity,
            state: ChannelState::new(),
            delegate,
        })
    }

    #[must_use]
    pub const fn delegate(&self) -> &SharedChannel {
        &self.delegate
    }
}

#[async_trait]
impl Channel for DelegatingChannel {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn state(&self) -> Option<&ChannelState> {
        Some(&self.state)
    }

    async fn connect_with(&self, params: ConnectParams) -> Result<()> {
        self.delegate.connect_with(params).await?;
        self.state.open(&self.identity);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let closed = self.delegate.close().await;
        self.state.close(&self.identity);
        closed
    }

    async fn add_transport_listener(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        self.delegate.add_transport_listener(listener).await
    }

    async fn remove_transport_listener(
        &self,
        listener: &Arc<dyn TransportListener>,
    ) -> Result<()> {
        self.delegate.remove_transport_listener(listener).await
    }

    async fn send_message(&self, message: &dyn Message, recipients: &[Address]) -> Result<()> {
        self.delegate.send_message(message, recipients).await
    }
}
