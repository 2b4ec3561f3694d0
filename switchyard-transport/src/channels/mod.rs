//! Built-in channels.
//!
//! Terminal channels ([`NullChannel`], [`FileChannel`], [`TimeoutChannel`]
//! without a delegate) deliver or discard messages themselves. The rest wrap
//! another channel: [`DelegatingChannel`] builds it from embedded
//! configuration when constructed, [`NamedChannel`] and
//! [`RecipientOverrideChannel`] look it up by name on first use.

mod delegating;
mod error;
mod file;
mod named;
mod null;
mod rcpt;
mod timeout;

pub use delegating::DelegatingChannel;
pub use error::{ErrorChannel, THROW_ERROR_HEADER};
pub use file::FileChannel;
pub use named::NamedChannel;
pub use null::NullChannel;
pub use rcpt::RecipientOverrideChannel;
pub use test::{Call, TestChannel};
pub use timeout::TimeoutChannel;
