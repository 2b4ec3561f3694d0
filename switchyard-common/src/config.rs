//! Flat, immutable configuration scopes.
//!
//! Every channel reads its settings from a [`ConfigScope`]: a snapshot of
//! string properties taken when the channel is constructed. Keys consumed by
//! a channel are namespaced as `mail.<protocol>.<name>`; an embedded child
//! channel gets its own scope carved out of `mail.<protocol>.delegate.*` and
//! rewritten to `mail.*`.
//!
//! Scopes can be loaded from RON:
//! ```ron
//! {
//!     "mail.transport.protocol": "rcpt",
//!     "mail.rcpt.delegate": "staging",
//!     "mail.rcpt.address": "qa@example.com",
//! }
//! ```

use std::{collections::BTreeMap, fmt, path::Path, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prefix every scope is rooted at.
pub const ROOT_PREFIX: &str = "mail.";

/// Selects the protocol of a scope's default channel.
pub const TRANSPORT_PROTOCOL: &str = "mail.transport.protocol";

/// Builds the fully qualified key `mail.<protocol>.<name>`.
#[must_use]
pub fn key(protocol: &str, name: &str) -> String {
    format!("{ROOT_PREFIX}{protocol}.{name}")
}

/// Prefix of the subtree holding an embedded delegate's configuration.
#[must_use]
pub fn delegate_prefix(protocol: &str) -> String {
    format!("{ROOT_PREFIX}{protocol}.delegate.")
}

/// An immutable snapshot of key/value configuration.
///
/// Cloning is cheap; deriving a scope (see [`ConfigScope::subscope`] and
/// [`ConfigScope::with`]) always produces an independent copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigScope {
    properties: Arc<BTreeMap<String, String>>,
}

impl ConfigScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a scope from a RON map of strings.
    ///
    /// # Errors
    /// If the input is not a map of string keys to string values.
    pub fn from_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    /// Read a scope from a RON file.
    ///
    /// # Errors
    /// If the file cannot be read, or does not hold a property map.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_ron(&input)
    }

    /// Gets a property value, or `None` if no value is set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Gets a required property value.
    ///
    /// # Errors
    /// [`ConfigError::Missing`] if the property is not set.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Gets a boolean property, accepting `true`/`yes` and `false`/`no` in
    /// any case.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if the property holds anything else.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };

        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                reason: "allows either 'true' or 'false'".to_string(),
            }),
        }
    }

    /// Gets an integer property.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if the property is not an integer.
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        self.parse(key).map(|value| value.unwrap_or(default))
    }

    /// Parses a property with [`FromStr`], returning `None` when it is unset.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] if the value does not parse.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                    key: key.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()
    }

    /// Carve out every key starting with `prefix`, renaming it so that the
    /// prefix becomes [`ROOT_PREFIX`].
    ///
    /// Keys outside the prefix are not carried over: a nested channel never
    /// sees its parent's configuration.
    #[must_use]
    pub fn subscope(&self, prefix: &str) -> Self {
        self.properties
            .iter()
            .filter_map(|(name, value)| {
                name.strip_prefix(prefix)
                    .map(|rest| (format!("{ROOT_PREFIX}{rest}"), value.clone()))
            })
            .collect()
    }

    /// The embedded delegate configuration of `protocol`, remapped to `mail.*`.
    #[must_use]
    pub fn delegate_scope(&self, protocol: &str) -> Self {
        self.subscope(&delegate_prefix(protocol))
    }

    /// A copy of this scope with `key` set to `value`.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut properties = self.properties.as_ref().clone();
        properties.insert(key.into(), value.into());

        Self {
            properties: Arc::new(properties),
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigScope
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: Arc::new(
                iter.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<BTreeMap<String, String>> for ConfigScope {
    fn from(value: BTreeMap<String, String>) -> Self {
        Self {
            properties: Arc::new(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_subscope_isolates_delegate_keys() {
        let scope = ConfigScope::from_iter([
            ("mail.x.delegate.file.path", "P"),
            ("mail.x.other", "Q"),
        ]);

        let child = scope.subscope("mail.x.delegate.");

        assert_eq!(child, ConfigScope::from_iter([("mail.file.path", "P")]));
    }

    #[test]
    fn test_delegate_scope() {
        let scope = ConfigScope::from_iter([
            ("mail.test.delegate.transport.protocol", "file"),
            ("mail.test.delegate.file.path", "somePath"),
            ("mail.transport.protocol", "test"),
        ]);

        let child = scope.delegate_scope("test");
        assert_eq!(child.get("mail.transport.protocol"), Some("file"));
        assert_eq!(child.get("mail.file.path"), Some("somePath"));
        assert_eq!(child.len(), 2);
    }

    #[test]
    fn test_subscope_only_rewrites_leading_prefix() {
        let scope = ConfigScope::from_iter([("mail.a.delegate.mail.a.delegate.x", "v")]);
        let child = scope.subscope("mail.a.delegate.");
        assert_eq!(child.get("mail.mail.a.delegate.x"), Some("v"));
    }

    #[test]
    fn test_derived_scopes_are_independent() {
        let parent = ConfigScope::from_iter([("mail.x.delegate.file.path", "P")]);
        let child = parent.delegate_scope("x");

        let parent = parent.with("mail.x.delegate.file.path", "changed");

        assert_eq!(parent.get("mail.x.delegate.file.path"), Some("changed"));
        assert_eq!(child.get("mail.file.path"), Some("P"));
    }

    #[test]
    fn test_require() {
        let scope = ConfigScope::from_iter([("mail.file.path", "/tmp/mail")]);
        assert_eq!(scope.require("mail.file.path").unwrap(), "/tmp/mail");

        let err = scope.require("mail.rcpt.address").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(key) if key == "mail.rcpt.address"));
    }

    #[test]
    fn test_get_bool() {
        let scope = ConfigScope::from_iter([
            ("yes", " YES "),
            ("true", "True"),
            ("no", "no"),
            ("false", "FALSE"),
            ("bogus", "maybe"),
        ]);

        assert!(scope.get_bool("yes", false).unwrap());
        assert!(scope.get_bool("true", false).unwrap());
        assert!(!scope.get_bool("no", true).unwrap());
        assert!(!scope.get_bool("false", true).unwrap());
        assert!(scope.get_bool("unset", true).unwrap());
        assert!(matches!(
            scope.get_bool("bogus", true),
            Err(ConfigError::Invalid { key, .. }) if key == "bogus"
        ));
    }

    #[test]
    fn test_get_int() {
        let scope = ConfigScope::from_iter([("ten", "10"), ("negative", "-1"), ("word", "ten")]);

        assert_eq!(scope.get_int("ten", 0).unwrap(), 10);
        assert_eq!(scope.get_int("negative", 0).unwrap(), -1);
        assert_eq!(scope.get_int("unset", 42).unwrap(), 42);
        assert!(scope.get_int("word", 0).is_err());
    }

    #[test]
    fn test_from_ron() {
        let scope = ConfigScope::from_ron(
            r#"{
                "mail.transport.protocol": "file",
                "mail.file.path": "/var/mail/archive",
            }"#,
        )
        .unwrap();

        assert_eq!(scope.get(TRANSPORT_PROTOCOL), Some("file"));
        assert_eq!(scope.get("mail.file.path"), Some("/var/mail/archive"));
        assert!(ConfigScope::from_ron("[1, 2]").is_err());
    }

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "mail.transport.protocol": "null" }}"#).unwrap();

        let scope = ConfigScope::load(file.path()).unwrap();
        assert_eq!(scope.get(TRANSPORT_PROTOCOL), Some("null"));

        assert!(matches!(
            ConfigScope::load("/definitely/not/here.ron"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_key_helpers() {
        assert_eq!(key("rcpt", "address"), "mail.rcpt.address");
        assert_eq!(delegate_prefix("error"), "mail.error.delegate.");
    }
}
