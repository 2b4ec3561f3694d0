use async_trait::async_trait;
use switchyard_common::{Address, Message, dispatch};

use crate::{
    channel::{Channel, ConnectParams, Identity},
    error::Result,
    event::TransportEvent,
    state::ChannelState,
};

/// Accepts every connection and discards every message.
#[derive(Debug)]
pub struct NullChannel {
    identity: Identity,
    state: ChannelState,
}

impl NullChannel {
    pub const PROTOCOL: &'static str = "null";

    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            state: ChannelState::new(),
        }
    }
}

#[async_trait]
impl Channel for NullChannel {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn state(&self) -> Option<&ChannelState> {
        Some(&self.state)
    }

    async fn connect_with(&self, _params: ConnectParams) -> Result<()> {
        self.state.open(&self.identity);
        Ok(())
    }

    async fn send_message(&self, message: &dyn Message, recipients: &[Address]) -> Result<()> {
        dispatch!(
            level = DEBUG,
            "Discarding message {:?} for {} recipient(s)",
            message.message_id(),
            recipients.len()
        );
        self.state
            .notify_transport(&TransportEvent::delivered(message.message_id(), recipients));
        Ok(())
    }
}
