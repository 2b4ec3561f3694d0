//! Shared building blocks for the switchyard dispatch layer: configuration
//! scopes, recipient addresses, the message abstraction and logging.

pub mod address;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;

pub use address::{Address, AddressList};
pub use config::ConfigScope;
pub use error::{AddressError, ConfigError, MessageError};
pub use message::{MailMessage, Message};
pub use tracing;

/// Out-of-band signals delivered to long running channel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Abandon whatever is in progress.
    Shutdown,
}
