use std::sync::Arc;

use async_trait::async_trait;
use switchyard_common::{Address, AddressList, ConfigScope, Message, config, dispatch};

use crate::{
    channel::{Channel, ConnectParams, Identity},
    error::{DispatchError, Result},
    event::{ConnectionListener, TransportListener},
    resolver::DelegateResolver,
    session::Session,
};

/// Redirects every message to the fixed recipients in `mail.rcpt.address`,
/// ignoring the recipients the caller asked for.
///
/// The delegate is resolved by name, as for [`super::NamedChannel`].
#[derive(Debug)]
pub struct RecipientOverrideChannel {
    identity: Identity,
    scope: ConfigScope,
    address_key: String,
    resolver: DelegateResolver,
}

impl RecipientOverrideChannel {
    pub const PROTOCOL: &'static str = "rcpt";

    /// # Errors
    /// If the configured locator cannot be created.
    pub fn new(session: &Session, identity: Identity) -> Result<Self> {
        let resolver = DelegateResolver::new(session, identity.protocol())?;

        Ok(Self {
            address_key: config::key(identity.protocol(), "address"),
            scope: session.scope().clone(),
            identity,
            resolver,
        })
    }

    /// The configured recipients.
    ///
    /// # Errors
    /// [`DispatchError::ConfigMissing`] if the key is unset,
    /// [`DispatchError::ConfigInvalid`] if it holds an invalid address and
    /// [`DispatchError::NoRecipientsConfigured`] if it holds none.
    pub fn recipients(&self) -> Result<AddressList> {
        let value = self.scope.require(&self.address_key)?;
        let recipients =
            AddressList::parse(value).map_err(|err| DispatchError::ConfigInvalid {
                key: self.address_key.clone(),
                reason: err.to_string(),
            })?;

        if recipients.is_empty() {
            return Err(DispatchError::NoRecipientsConfigured(
                self.address_key.clone(),
            ));
        }
        Ok(recipients)
    }
}

#[async_trait]
impl Channel for RecipientOverrideChannel {
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

    async fn send_message(&self, message: &dyn Message, _recipients: &[Address]) -> Result<()> {
        let recipients = self.recipients()?;
        dispatch!(
            level = INFO,
            "Redirecting message {:?} to {recipients}",
            message.message_id()
        );

        self.resolver
            .resolve()
            .await?
            .send_message(message, &recipients)
            .await
    }
}
