//! The uniform delivery contract shared by every channel.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use switchyard_common::{Address, ConfigScope, Message, config};

use crate::{
    error::{DispatchError, Result},
    event::{ConnectionListener, TransportListener},
    state::ChannelState,
};

/// A channel as handed out by the registry.
pub type SharedChannel = Arc<dyn Channel>;

/// Who a channel talks to, assigned once at construction.
///
/// Unused parts are `None` rather than sentinel values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Identity {
    protocol: String,
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
}

impl Identity {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            ..Self::default()
        }
    }

    /// Build the identity of a `protocol` channel from the connection
    /// defaults in `scope`, preferring protocol specific keys.
    ///
    /// A port of zero or below means no port.
    ///
    /// # Errors
    /// If `mail.<protocol>.port` is not a number or is above 65535.
    pub fn from_scope(protocol: &str, scope: &ConfigScope) -> Result<Self> {
        let lookup = |name: &str| {
            scope
                .get(&config::key(protocol, name))
                .or_else(|| scope.get(&format!("{}{name}", config::ROOT_PREFIX)))
                .map(str::to_string)
        };

        Ok(Self {
            protocol: protocol.to_string(),
            host: lookup("host"),
            port: port(scope, &config::key(protocol, "port"))?,
            user: lookup("user"),
            password: None,
        })
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

fn port(scope: &ConfigScope, key: &str) -> Result<Option<u16>> {
    let Some(port) = scope.parse::<i64>(key)?.filter(|port| *port > 0) else {
        return Ok(None);
    };

    u16::try_from(port)
        .map(Some)
        .map_err(|_| DispatchError::ConfigInvalid {
            key: key.to_string(),
            reason: format!("{port} is not a port number"),
        })
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.protocol)?;
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        if let Some(host) = &self.host {
            f.write_str(host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The identity fields supplied to a connect call.
///
/// Each variant corresponds to one of the connect entry points on
/// [`Channel`]; wrappers pass it on untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectParams {
    #[default]
    Default,
    User {
        user: Option<String>,
        password: Option<String>,
    },
    Host {
        host: Option<String>,
        user: Option<String>,
        password: Option<String>,
    },
    HostPort {
        host: Option<String>,
        port: Option<u16>,
        user: Option<String>,
        password: Option<String>,
    },
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// A delivery endpoint.
///
/// Terminal channels deliver (or discard, or fail) messages themselves;
/// wrapping channels hold another [`SharedChannel`] and forward to it. Both
/// are used the same way, through `Arc<dyn Channel>`, from any number of
/// tasks at once.
///
/// Channels that keep their own connection flag and listener lists expose a
/// [`ChannelState`] through [`Channel::state`]; the provided methods then
/// handle `is_connected`, `close` and listener registration.
#[async_trait]
pub trait Channel: Send + Sync + fmt::Debug {
    fn identity(&self) -> &Identity;

    fn state(&self) -> Option<&ChannelState> {
        None
    }

    /// The single connect entry point every other connect method funnels
    /// into.
    ///
    /// # Errors
    /// If the channel, or the channel it forwards to, cannot connect.
    async fn connect_with(&self, params: ConnectParams) -> Result<()>;

    /// # Errors
    /// See [`Channel::connect_with`].
    async fn connect(&self) -> Result<()> {
        self.connect_with(ConnectParams::Default).await
    }

    /// # Errors
    /// See [`Channel::connect_with`].
    async fn connect_user(&self, user: Option<&str>, password: Option<&str>) -> Result<()> {
        self.connect_with(ConnectParams::User {
            user: owned(user),
            password: owned(password),
        })
        .await
    }

    /// # Errors
    /// See [`Channel::connect_with`].
    async fn connect_host(
        &self,
        host: Option<&str>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        self.connect_with(ConnectParams::Host {
            host: owned(host),
            user: owned(user),
            password: owned(password),
        })
        .await
    }

    /// # Errors
    /// See [`Channel::connect_with`].
    async fn connect_host_port(
        &self,
        host: Option<&str>,
        port: Option<u16>,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<()> {
        self.connect_with(ConnectParams::HostPort {
            host: owned(host),
            port,
            user: owned(user),
            password: owned(password),
        })
        .await
    }

    async fn is_connected(&self) -> bool {
        self.state().is_some_and(ChannelState::is_connected)
    }

    /// # Errors
    /// If the channel this one forwards to fails to close.
    async fn close(&self) -> Result<()> {
        if let Some(state) = self.state() {
            state.close(self.identity());
        }
        Ok(())
    }

    /// # Errors
    /// If registration has to resolve a delegate and that fails.
    async fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) -> Result<()> {
        self.state()
            .ok_or_else(|| unsupported(self.identity()))?
            .add_connection_listener(listener);
        Ok(())
    }

    /// # Errors
    /// See [`Channel::add_connection_listener`].
    async fn remove_connection_listener(
        &self,
        listener: &Arc<dyn ConnectionListener>,
    ) -> Result<()> {
        self.state()
            .ok_or_else(|| unsupported(self.identity()))?
            .remove_connection_listener(listener);
        Ok(())
    }

    /// # Errors
    /// See [`Channel::add_connection_listener`].
    async fn add_transport_listener(&self, listener: Arc<dyn TransportListener>) -> Result<()> {
        self.state()
            .ok_or_else(|| unsupported(self.identity()))?
            .add_transport_listener(listener);
        Ok(())
    }

    /// # Errors
    /// See [`Channel::add_connection_listener`].
    async fn remove_transport_listener(
        &self,
        listener: &Arc<dyn TransportListener>,
    ) -> Result<()> {
        self.state()
            .ok_or_else(|| unsupported(self.identity()))?
            .remove_transport_listener(listener);
        Ok(())
    }

    /// Deliver `message` to `recipients`. Success is silent.
    ///
    /// # Errors
    /// Any failure to deliver, including one raised by a channel further
    /// down the chain, which is returned unchanged.
    async fn send_message(&self, message: &dyn Message, recipients: &[Address]) -> Result<()>;
}

fn unsupported(identity: &Identity) -> DispatchError {
    DispatchError::messaging(format!("{identity} does not accept listeners"))
}

/// Erase a concrete channel into the form the registry hands out.
pub fn shared<C: Channel + 'static>(channel: C) -> SharedChannel {
    Arc::new(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display_hides_password() {
        let identity = Identity::new("smtp")
            .with_host("mx.example.org")
            .with_port(2525)
            .with_user("alice")
            .with_password("hunter2");

        assert_eq!(identity.to_string(), "smtp://alice@mx.example.org:2525");
        assert!(!format!("{identity:?}").contains("hunter2"));
    }

    #[test]
    fn test_identity_from_scope_prefers_protocol_keys() {
        let scope: ConfigScope = [
            ("mail.host", "fallback.example.org"),
            ("mail.user", "bob"),
            ("mail.file.host", "files.example.org"),
            ("mail.file.port", "25"),
        ]
        .into_iter()
        .collect();

        let identity = Identity::from_scope("file", &scope).unwrap();
        assert_eq!(identity.host(), Some("files.example.org"));
        assert_eq!(identity.port(), Some(25));
        assert_eq!(identity.user(), Some("bob"));

        let identity = Identity::from_scope("null", &scope).unwrap();
        assert_eq!(identity.host(), Some("fallback.example.org"));
        assert_eq!(identity.port(), None);
    }

    #[test]
    fn test_identity_rejects_bad_port() {
        let scope: ConfigScope = [("mail.file.port", "seventy")].into_iter().collect();
        assert!(matches!(
            Identity::from_scope("file", &scope),
            Err(DispatchError::ConfigInvalid { key, .. }) if key == "mail.file.port"
        ));

        let scope: ConfigScope = [("mail.file.port", "65536")].into_iter().collect();
        assert!(matches!(
            Identity::from_scope("file", &scope),
            Err(DispatchError::ConfigInvalid { key, .. }) if key == "mail.file.port"
        ));
    }

    #[test]
    fn test_identity_non_positive_port_is_unused() {
        for value in ["-1", "0"] {
            let scope: ConfigScope = [("mail.file.port", value)].into_iter().collect();
            let identity = Identity::from_scope("file", &scope).unwrap();
            assert_eq!(identity.port(), None);
        }
    }
}
