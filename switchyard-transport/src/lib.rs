//! Configurable, chainable mail delivery channels.
//!
//! A [`Session`] pairs a [`ConfigScope`](switchyard_common::ConfigScope) with
//! a [`ChannelRegistry`] and turns protocol names into channels. Channels
//! either deliver a message themselves or forward it to another channel,
//! built from embedded configuration ([`channels::DelegatingChannel`]) or
//! looked up by name through a [`DirectoryLocator`]
//! ([`channels::NamedChannel`], [`channels::RecipientOverrideChannel`]).

pub mod channel;
pub mod channels;
pub mod error;
pub mod event;
pub mod locator;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod state;

pub use channel::{Channel, ConnectParams, Identity, SharedChannel};
pub use error::{DispatchError, Result};
pub use event::{
    ConnectionEvent, ConnectionEventKind, ConnectionListener, TransportEvent, TransportEventKind,
    TransportListener,
};
pub use locator::{DirectoryLocator, DirectoryObject, LocatorRegistry};
pub use registry::ChannelRegistry;
pub use resolver::DelegateResolver;
pub use session::Session;
pub use state::ChannelState;
