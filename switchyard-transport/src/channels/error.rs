use std::sync::Arc;

use async_trait::async_trait;
use switchyard_common::{Address, Message, config, dispatch};

use super::DelegatingChannel;
use crate::{
    channel::{Channel, ConnectParams, Identity},
    error::{DispatchError, Result},
    event::{ConnectionListener, TransportListener},
    session::Session,
    state::ChannelState,
};

/// Header whose value makes [`ErrorChannel`] fail the send with that text.
pub const THROW_ERROR_HEADER: &str = "X-Throw-Error";

/// Fails sends on demand, otherwise behaves like a [`DelegatingChannel`].
///
/// A message carrying [`THROW_ERROR_HEADER`] fails with the header's value.
/// Without it, `mail.error.message` is used as a default failure. With
/// neither, the message goes to the embedded delegate under
/// `mail.error.delegate.*`.
#[derive(Debug)]
pub struct ErrorChannel {
    inner: DelegatingChannel,
    default_error: Option<String>,
}

impl ErrorChannel {
    pub const PROTOCOL: &'static str = "error";

    /// # Errors
    /// If the embedded delegate is missing or cannot be built.
    pub fn new(session: &Session, identity: Identity) -> Result<Self> {
        let default_error = session
            .scope()
            .get(&config::key(identity.protocol(), "message"))
            .map(str::to_string);

        Ok(Self {
            inner: DelegatingChannel::new(session, identity)?,
            default_error,
        })
    }

    fn forced_error(&self, message: &dyn Message) -> Option<String> {
        message
            .header(THROW_ERROR_HEADER)
            .first()
            .map(|value| (*value).to_string())
            .or_else(|| self.default_error.clone())
    }
}

#[async_trait]
impl Channel for ErrorChannel {
    fn identity(&self) -> &Identity {
        self.inner.identity()
    }

    fn state(&self) -> Option<&ChannelState> {
        self.inner.state()
    }

    async fn connect_with(&self, params: ConnectParams) -> Result<()> {
        self.inner.connect_with(params).await
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    async fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) -> Result<()> {
        self.inner.add_connection_listener(listener).await
    }

    async fn remove_connection_listener(
        &self,
        listener: &Arc<dyn ConnectionListener>,
    ) -> Result<()> {
        self.inner.remove_connection_listener(listener).await
    }

    async fn add_transport_listener(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        self.inner.add_transport_listener(listener).await
    }

    async fn remove_transport_listener(
        &self,
        listener: &Arc<dyn TransportListener>,
    ) -> Result<()> {
        self.inner.remove_transport_listener(listener).await
    }

    async fn send_message(&self, message: &dyn Message, recipients: &[Address]) -> Result<()> {
        if let Some(error) = self.forced_error(message) {
            dispatch!(
                level = DEBUG,
                "Failing message {:?} on request: {error}",
                message.message_id()
            );
            return Err(DispatchError::messaging(error));
        }

        self.inner.send_message(message, recipients).await
    }
}
