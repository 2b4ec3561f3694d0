use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use switchyard_common::{ConfigScope, internal};

use super::{DirectoryLocator, DirectoryObject};
use crate::error::{DispatchError, Result};

/// Environment variable naming the directory file.
pub const DIRECTORY_ENV: &str = "SWITCHYARD_DIRECTORY";

/// The built-in locator, backed by a RON file mapping names to property
/// tables:
///
/// ```text
/// {
///     "archive": {
///         "mail.transport.protocol": "file",
///         "mail.file.path": "/var/mail/archive.mbox",
///     },
/// }
/// ```
///
/// The file is read once, when the locator is created. Each entry is handed
/// out as a [`ConfigScope`].
#[derive(Debug, Clone)]
pub struct DirectoryFileLocator {
    entries: Arc<HashMap<String, ConfigScope>>,
}

impl DirectoryFileLocator {
    /// Open the directory named by [`DIRECTORY_ENV`].
    ///
    /// # Errors
    /// [`DispatchError::LocatorUnavailable`] if the variable is unset or the
    /// file cannot be read.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(DIRECTORY_ENV).ok_or_else(|| {
            DispatchError::LocatorUnavailable(format!("{DIRECTORY_ENV} is not set"))
        })?;
        Self::open(path)
    }

    /// # Errors
    /// [`DispatchError::LocatorUnavailable`] if `path` cannot be read or
    /// parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| {
            DispatchError::LocatorUnavailable(format!("{}: {reason}", path.display()))
        };

        let contents =
            std::fs::read_to_string(path).map_err(|err| unavailable(err.to_string()))?;
        let entries: HashMap<String, ConfigScope> =
            ron::from_str(&contents).map_err(|err| unavailable(err.to_string()))?;

        internal!(
            level = DEBUG,
            "Loaded {} directory entries from {}",
            entries.len(),
            path.display()
        );

        Ok(Self {
            entries: Arc::new(entries),
        })
    }
}

#[async_trait]
impl DirectoryLocator for DirectoryFileLocator {
    async fn lookup(&self, name: &str) -> Result<Option<DirectoryObject>> {
        Ok(self
            .entries
            .get(name)
            .map(|scope| Arc::new(scope.clone()) as DirectoryObject))
    }
}
