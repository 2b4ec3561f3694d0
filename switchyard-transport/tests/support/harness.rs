//! Session harness for delegation tests
//!
//! ```no_run
//! let harness = DispatchHarness::new();
//! let target = harness.bind_test_channel("archive");
//!
//! let channel = harness
//!     .session([("mail.transport.protocol", "named"), ("mail.named.delegate", "archive")])
//!     .channel()
//!     .unwrap();
//! ```

use std::{sync::Arc, time::Duration};

use switchyard_common::ConfigScope;
use switchyard_transport::{
    ChannelRegistry, Session, channels::TestChannel, locator::MemoryLocator,
};

/// Locator identifier the harness registers its directory under.
pub const LOCATOR: &str = "memory";

pub struct DispatchHarness {
    locator: MemoryLocator,
    registry: Arc<ChannelRegistry>,
}

impl DispatchHarness {
    pub fn new() -> Self {
        Self::with_locator(MemoryLocator::new())
    }

    /// A harness whose directory answers after `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self::with_locator(MemoryLocator::new().with_latency(latency))
    }

    fn with_locator(locator: MemoryLocator) -> Self {
        switchyard_common::logging::try_init();

        let mut registry = ChannelRegistry::with_defaults();
        registry
            .locators_mut()
            .register_instance(LOCATOR, Arc::new(locator.clone()));

        Self {
            locator,
            registry: Arc::new(registry),
        }
    }

    pub const fn locator(&self) -> &MemoryLocator {
        &self.locator
    }

    /// Bind a fresh [`TestChannel`] under `name` and return it.
    pub fn bind_test_channel(&self, name: &str) -> Arc<TestChannel> {
        let channel = Arc::new(TestChannel::new("test"));
        self.locator.bind_channel(name, channel.clone());
        channel
    }

    /// A session over `properties`. Every `named` and `rcpt` channel in it
    /// resolves through the harness directory.
    pub fn session<'a>(
        &self,
        properties: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Session {
        let scope: ConfigScope = properties.into_iter().collect();
        let scope = scope
            .with("mail.named.locatorClass", LOCATOR)
            .with("mail.rcpt.locatorClass", LOCATOR);

        Session::new(scope, Arc::clone(&self.registry))
    }
}
