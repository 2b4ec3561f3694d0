use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use switchyard_common::{Address, ConfigScope, Message, config, dispatch, internal};

use super::delegating::embedded_delegate;
use crate::{
    channel::{Channel, ConnectParams, Identity, SharedChannel},
    error::{DispatchError, Result},
    event::{TransportEvent, TransportListener},
    session::Session,
    state::ChannelState,
};

/// Simulates a server that never answers.
///
/// `mail.timeout.connectionTimeout` and `mail.timeout.messageTimeout` are in
/// milliseconds; zero or a negative value disables the corresponding wait.
/// An enabled operation waits that long and then fails with
/// [`DispatchError::ConnectionTimeout`] or [`DispatchError::SendTimeout`].
/// Interrupting the session ends the wait early with the same failure.
///
/// Disabled operations go to the embedded delegate under
/// `mail.timeout.delegate.*` or, without one, succeed locally.
#[derive(Debug)]
pub struct TimeoutChannel {
    identity: Identity,
    state: ChannelState,
    session: Session,
    connection_timeout: Option<Duration>,
    message_timeout: Option<Duration>,
    delegate: Option<SharedChannel>,
}

fn duration(scope: &ConfigScope, key: &str) -> Result<Option<Duration>> {
    let millis = scope.get_int(key, 0)?;
    Ok(u64::try_from(millis)
        .ok()
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis))
}

impl TimeoutChannel {
    pub const PROTOCOL: &'static str = "timeout";

    /// # Errors
    /// If a timeout is not an integer or the embedded delegate cannot be
    /// built.
    pub fn new(session: &Session, identity: Identity) -> Result<Self> {
        let scope = session.scope();
        let protocol = identity.protocol();

        Ok(Self {
            connection_timeout: duration(scope, &config::key(protocol, "connectionTimeout"))?,
            message_timeout: duration(scope, &config::key(protocol, "messageTimeout"))?,
            delegate: embedded_delegate(session, protocol)?,
            state: ChannelState::new(),
            session: session.clone(),
            identity,
        })
    }

    /// Wait for `duration`, or until the session is interrupted.
    async fn stall(&self, duration: Duration) {
        let mut interrupt = self.session.subscribe();

        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            signal = interrupt.recv() => {
                internal!(level = DEBUG, "Simulated wait interrupted by {signal:?}");
            }
        }
    }
}

#[async_trait]
impl Channel for TimeoutChannel {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn state(&self) -> Option<&ChannelState> {
        Some(&self.state)
    }

    async fn connect_with(&self, params: ConnectParams) -> Result<()> {
        if let Some(timeout) = self.connection_timeout {
            self.stall(timeout).await;
            return Err(DispatchError::ConnectionTimeout(timeout));
        }

        if let Some(delegate) = &self.delegate {
            delegate.connect_with(params).await?;
        }
        self.state.open(&self.identity);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let closed = match &self.delegate {
            Some(delegate) => delegate.close().await,
            None => Ok(()),
        };
        self.state.close(&self.identity);
        closed
    }

    async fn add_transport_listener(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        match &self.delegate {
            Some(delegate) => delegate.add_transport_listener(listener).await,
            None => {
                self.state.add_transport_listener(listener);
                Ok(())
            }
        }
    }

    async fn remove_transport_listener(
        &self,
        listener: &Arc<dyn TransportListener>,
    ) -> Result<()> {
        match &self.delegate {
            Some(delegate) => delegate.remove_transport_listener(listener).await,
            None => {
                self.state.remove_transport_listener(listener);
                Ok(())
            }
        }
    }

    async fn send_message(&self, message: &dyn Message, recipients: &[Address]) -> Result<()> {
        if let Some(timeout) = self.message_timeout {
            self.stall(timeout).await;
            return Err(DispatchError::SendTimeout(timeout));
        }

        match &self.delegate {
            Some(delegate) => delegate.send_message(message, recipients).await,
            None => {
                dispatch!(
                    level = DEBUG,
                    "Accepted message {:?} without delay",
                    message.message_id()
                );
                self.state
                    .notify_transport(&TransportEvent::delivered(message.message_id(), recipients));
                Ok(())
            }
        }
    }
}
