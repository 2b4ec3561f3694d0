use std::sync::Arc;

use async_trait::async_trait;
use switchyard_common::{Address, Message};

use crate::{
    channel::{Channel, ConnectParams, Identity},
    error::Result,
    event::{ConnectionListener, TransportListener},
    resolver::DelegateResolver,
    session::Session,
};

/// Forwards everything to the channel bound to `mail.<protocol>.delegate`
/// in the directory.
///
/// The delegate is looked up on the first operation that needs it and kept
/// from then on. Until then the channel reports itself disconnected and
/// closing it does nothing.
#[derive(Debug)]
pub struct NamedChannel {
    identity: Identity,
    resolver: DelegateResolver,
}

impl NamedChannel {
    pub const PROTOCOL: &'static str = "named";

    /// # Errors
    /// If the configured locator cannot be created.
    pub fn new(session: &Session, identity: Identity) -> Result<Self> {
        let resolver = DelegateResolver::new(session, identity.protocol())?;
        Ok(Self { identity, resolver })
    }

    #[must_use]
    pub const fn resolver(&self) -> &DelegateResolver {
        &self.resolver
    }
}

#[async_trait]
impl Channel for NamedChannel {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    async fn connect_with(&self, params: ConnectParams) -> Result<()> {
        self.resolver.resolve().await?.connect_with(params).await
    }

    async fn is_connected(&self) -> bool {
        match self.resolver.resolved() {
            Some(delegate) => delegate.is_connected().await,
            None => false,
        }
    }

    async fn close(&self) -> Result<()> {
        match self.resolver.resolved() {
            Some(delegate) => delegate.close().await,
            None => Ok(()),
        }
    }

    async fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) -> Result<()> {
        self.resolver
            .resolve()
            .await?
            .add_connection_listener(listener)
            .await
    }

    async fn remove_connection_listener(
        &self,
        listener: &Arc<dyn ConnectionListener>,
    ) -> Result<()> {
        self.resolver
            .resolve()
            .await?
            .remove_connection_listener(listener)
            .await
    }

    async fn add_transport_listener(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        self.resolver
            .resolve()
            .await?
            .add_transport_listener(listener)
            .await
    }

    async fn remove_transport_listener(
        &self,
        listener: &Arc<dyn TransportListener>,
    ) -> Result<()> {
        self.resolver
            .resolve()
            .await?
            .remove_transport_listener(listener)
            .await
    }

    async fn send_message(&self, message: &dyn Message, recipients: &[Address]) -> Result<()> {
        self.resolver
            .resolve()
            .await?
            .send_message(message, recipients)
            .await
    }
}
