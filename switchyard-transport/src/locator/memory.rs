use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DirectoryLocator, DirectoryObject};
use crate::{
    channel::SharedChannel,
    error::{DispatchError, Result},
};

#[derive(Default)]
struct Inner {
    objects: RwLock<HashMap<String, DirectoryObject>>,
    lookups: AtomicUsize,
    failures: AtomicUsize,
}

/// In-memory directory
///
/// Clones share the same bindings and counters, so a test can keep one handle
/// while a channel resolves through another. Lookups are counted, and the
/// next `n` lookups can be made to fail to simulate a directory outage.
#[derive(Clone, Default)]
pub struct MemoryLocator {
    inner: Arc<Inner>,
    latency: Option<Duration>,
}

impl MemoryLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup by `latency`, widening the window for concurrent
    /// callers to race.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn bind<T: Any + Send + Sync>(&self, name: impl Into<String>, object: T) {
        self.inner
            .objects
            .write()
            .insert(name.into(), Arc::new(object));
    }

    pub fn bind_channel(&self, name: impl Into<String>, channel: SharedChannel) {
        self.bind(name, channel);
    }

    pub fn unbind(&self, name: &str) {
        self.inner.objects.write().remove(name);
    }

    /// Number of lookups made so far, failed ones included.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.inner.lookups.load(Ordering::SeqCst)
    }

    /// Make the next `count` lookups fail with
    /// [`DispatchError::LocatorUnavailable`].
    pub fn fail_next(&self, count: usize) {
        self.inner.failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectoryLocator for MemoryLocator {
    async fn lookup(&self, name: &str) -> Result<Option<DirectoryObject>> {
        self.inner.lookups.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self
            .inner
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DispatchError::LocatorUnavailable(format!(
                "directory offline while looking up {name}"
            )));
        }

        let object = self.inner.objects.read().get(name).cloned();
        Ok(object)
    }
}

impl fmt::Debug for MemoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.inner.objects.read().keys().cloned().collect();
        names.sort();

        f.debug_struct("MemoryLocator")
            .field("names", &names)
            .field("lookups", &self.lookups())
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}
