//! Error types for the switchyard-common crate.
//!
//! These cover the building blocks shared by every channel: reading a
//! configuration scope, parsing recipient addresses and parsing messages.

use std::io;

use thiserror::Error;

/// Errors raised while reading a [`ConfigScope`](crate::config::ConfigScope).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required property is not set.
    #[error("property {0} is required")]
    Missing(String),

    /// A property is set, but to a value that cannot be used.
    #[error("property {key} is invalid: {reason}")]
    Invalid { key: String, reason: String },

    /// The configuration file could not be read.
    #[error("unable to read configuration from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not a valid property map.
    #[error("unable to parse configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

impl ConfigError {
    /// The property this error refers to, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Missing(key) | Self::Invalid { key, .. } => Some(key),
            Self::Io { .. } | Self::Parse(_) => None,
        }
    }
}

/// Errors raised while parsing a recipient address.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The input is not an RFC 5322 address.
    #[error("invalid address '{input}': {reason}")]
    Invalid { input: String, reason: String },
}

/// Errors raised while parsing a message.
#[derive(Debug, Error)]
pub enum MessageError {
    /// The header block could not be parsed.
    #[error("invalid message headers: {0}")]
    Headers(#[from] mailparse::MailParseError),

    /// A recipient header holds an unparsable address.
    #[error(transparent)]
    Address(#[from] AddressError),
}
