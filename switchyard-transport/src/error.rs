//! Typed error handling for channel operations.
//!
//! Failures are grouped by when they can happen:
//! - construction time (configuration, unknown protocols, locator setup)
//! - resolution time (a named delegate could not be found, retryable)
//! - delivery time (messaging failures and simulated timeouts)

use std::{error::Error as StdError, time::Duration};

use switchyard_common::ConfigError;
use thiserror::Error;

/// Specialised `Result` type for channel operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A required property is not set.
    #[error("property {0} is required")]
    ConfigMissing(String),

    /// A property is set to an unusable value.
    #[error("property {key} is invalid: {reason}")]
    ConfigInvalid { key: String, reason: String },

    /// No provider is registered for the protocol.
    #[error("no channel provider for protocol: {0}")]
    UnknownProtocol(String),

    /// The directory backing the default locator cannot be reached.
    #[error("directory unavailable: {0}")]
    LocatorUnavailable(String),

    /// The configured locator could not be created.
    #[error("invalid locator configuration: {0}")]
    LocatorConfig(String),

    /// The directory has no channel-bearing object under this name.
    #[error("delegate not found: {0}")]
    DelegateNotFound(String),

    /// The recipient override list is empty.
    #[error("no recipient addresses specified in {0}")]
    NoRecipientsConfigured(String),

    /// Delivery failed. The display text is exactly `message`.
    #[error("{message}")]
    Messaging {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// Connecting did not complete in time.
    #[error("timed out connecting to host after {}ms", .0.as_millis())]
    ConnectionTimeout(Duration),

    /// Sending did not complete in time.
    #[error("timed out sending message after {}ms", .0.as_millis())]
    SendTimeout(Duration),
}

impl DispatchError {
    /// A delivery failure with no underlying cause.
    pub fn messaging(message: impl Into<String>) -> Self {
        Self::Messaging {
            message: message.into(),
            source: None,
        }
    }

    /// A delivery failure caused by `source`.
    pub fn messaging_caused_by(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Messaging {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if retrying the same call on the same channel may
    /// succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DelegateNotFound(_)
                | Self::LocatorUnavailable(_)
                | Self::ConnectionTimeout(_)
                | Self::SendTimeout(_)
        )
    }

    /// Returns `true` if the error stems from configuration, which no retry
    /// will fix.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigMissing(_)
                | Self::ConfigInvalid { .. }
                | Self::UnknownProtocol(_)
                | Self::LocatorConfig(_)
                | Self::NoRecipientsConfigured(_)
        )
    }
}

impl From<ConfigError> for DispatchError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Missing(key) => Self::ConfigMissing(key),
            ConfigError::Invalid { key, reason } => Self::ConfigInvalid { key, reason },
            ConfigError::Io { path, source } => Self::ConfigInvalid {
                key: path,
                reason: source.to_string(),
            },
            ConfigError::Parse(err) => Self::ConfigInvalid {
                key: String::from("<input>"),
                reason: err.to_string(),
            },
        }
    }
}
