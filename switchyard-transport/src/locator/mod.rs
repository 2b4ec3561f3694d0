//! Name to object lookup used to find delegates at runtime.

mod directory;
mod memory;

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
pub use directory::{DIRECTORY_ENV, DirectoryFileLocator};
pub use memory::MemoryLocator;
use switchyard_common::internal;

use crate::error::{DispatchError, Result};

/// Whatever a directory holds under a name.
///
/// Resolution understands a [`crate::Session`], a
/// [`switchyard_common::ConfigScope`] and a [`crate::SharedChannel`].
pub type DirectoryObject = Arc<dyn Any + Send + Sync>;

/// Identifier of the locator used when a channel does not configure one.
pub const DEFAULT_LOCATOR: &str = "directory";

#[async_trait]
pub trait DirectoryLocator: Send + Sync + fmt::Debug {
    /// Find the object bound to `name`, if any.
    ///
    /// # Errors
    /// If the directory cannot be consulted right now.
    async fn lookup(&self, name: &str) -> Result<Option<DirectoryObject>>;
}

pub type LocatorFactory = Arc<dyn Fn() -> Result<Arc<dyn DirectoryLocator>> + Send + Sync>;

/// Locator factories by identifier, as named by `mail.<protocol>.locatorClass`.
pub struct LocatorRegistry {
    factories: HashMap<String, LocatorFactory>,
}

impl Default for LocatorRegistry {
    fn default() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(DEFAULT_LOCATOR, || {
            DirectoryFileLocator::from_env()
                .map(|locator| Arc::new(locator) as Arc<dyn DirectoryLocator>)
        });
        registry
    }
}

impl LocatorRegistry {
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn DirectoryLocator>> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
    }

    /// Every channel asking for `id` shares `locator`.
    pub fn register_instance(&mut self, id: impl Into<String>, locator: Arc<dyn DirectoryLocator>) {
        self.register(id, move || Ok(Arc::clone(&locator)));
    }

    /// Instantiate the locator registered as `id`, or the default one.
    ///
    /// # Errors
    /// [`DispatchError::LocatorConfig`] for an unknown identifier or a
    /// configured locator that cannot be built. The default locator's own
    /// failure is returned as is.
    pub fn create(&self, id: Option<&str>) -> Result<Arc<dyn DirectoryLocator>> {
        let explicit = id.is_some();
        let id = id.unwrap_or(DEFAULT_LOCATOR);

        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| DispatchError::LocatorConfig(format!("unknown locator: {id}")))?;

        internal!("Creating locator {id}");
        factory().map_err(|err| {
            if explicit {
                DispatchError::LocatorConfig(format!("unable to create locator {id}: {err}"))
            } else {
                err
            }
        })
    }
}

impl fmt::Debug for LocatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        f.debug_list().entries(ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_locator_is_a_config_error() {
        let registry = LocatorRegistry::default();
        assert!(matches!(
            registry.create(Some("com.example.Missing")),
            Err(DispatchError::LocatorConfig(_))
        ));
    }

    #[test]
    fn test_failing_factory_is_a_config_error() {
        let mut registry = LocatorRegistry::default();
        registry.register("broken", || {
            Err(DispatchError::LocatorUnavailable("nope".into()))
        });

        assert!(matches!(
            registry.create(Some("broken")),
            Err(DispatchError::LocatorConfig(reason)) if reason.contains("nope")
        ));
    }

    #[test]
    fn test_registered_instance_is_shared() {
        let memory = MemoryLocator::new();
        let mut registry = LocatorRegistry::default();
        registry.register_instance("memory", Arc::new(memory.clone()));

        let first = registry.create(Some("memory")).unwrap();
        let second = registry.create(Some("memory")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
