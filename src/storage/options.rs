use std::fmt;
use std::sync::Arc;
use time::Duration;

use crate::config::StorageConfig;
use crate::storage::envelope::{ExpiredEntry, Resolution, VersionedEntry};

/// Called when a read finds an expired entry.
pub type ExpiredHook<T> =
    Arc<dyn Fn(ExpiredEntry<T>) -> Resolution<ExpiredEntry<T>> + Send + Sync>;

/// Called when a read finds an entry whose version differs from the requested
/// one. The second argument is the requested version.
pub type VersionMismatchHook<T> =
    Arc<dyn Fn(VersionedEntry<T>, &str) -> Resolution<VersionedEntry<T>> + Send + Sync>;

/// Per-call (or per-item) options for local storage.
///
/// `ttl` only matters on write, the hooks only on read. `version` tags the
/// envelope on write and is compared with the stored tag on read.
pub struct AccessOptions<T> {
    pub ttl: Option<Duration>,
    pub version: Option<String>,
    pub on_expired: Option<ExpiredHook<T>>,
    pub on_version_mismatch: Option<VersionMismatchHook<T>>,
}

impl<T> AccessOptions<T> {
    pub fn new() -> Self {
        Self {
            ttl: None,
            version: None,
            on_expired: None,
            on_version_mismatch: None,
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn on_expired<F>(mut self, f: F) -> Self
    where
        F: Fn(ExpiredEntry<T>) -> Resolution<ExpiredEntry<T>> + Send + Sync + 'static,
    {
        self.on_expired = Some(Arc::new(f));
        self
    }

    pub fn on_version_mismatch<F>(mut self, f: F) -> Self
    where
        F: Fn(VersionedEntry<T>, &str) -> Resolution<VersionedEntry<T>> + Send + Sync + 'static,
    {
        self.on_version_mismatch = Some(Arc::new(f));
        self
    }

    /// Fills the fields left unset from the global defaults. Hooks are typed
    /// per item and never come from the defaults.
    pub(crate) fn over_defaults(self, defaults: &StorageConfig) -> Self {
        Self {
            ttl: self.ttl.or(defaults.ttl),
            version: self.version.or_else(|| defaults.version.clone()),
            on_expired: self.on_expired,
            on_version_mismatch: self.on_version_mismatch,
        }
    }
}

impl<T> Default for AccessOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AccessOptions<T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            version: self.version.clone(),
            on_expired: self.on_expired.clone(),
            on_version_mismatch: self.on_version_mismatch.clone(),
        }
    }
}

impl<T> fmt::Debug for AccessOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessOptions")
            .field("ttl", &self.ttl)
            .field("version", &self.version)
            .field("on_expired", &self.on_expired.is_some())
            .field("on_version_mismatch", &self.on_version_mismatch.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_fields_win_over_defaults() {
        let defaults = StorageConfig::builder()
            .ttl(Duration::seconds(10))
            .version("1.0")
            .build()
            .unwrap();

        let opts = AccessOptions::<String>::new().version("2.0").over_defaults(&defaults);
        assert_eq!(opts.version.as_deref(), Some("2.0"));
        assert_eq!(opts.ttl, Some(Duration::seconds(10)));
    }

    #[test]
    fn hooks_survive_merge_and_clone() {
        let opts = AccessOptions::<u32>::new()
            .on_expired(|_| Resolution::Evict)
            .over_defaults(&StorageConfig::default());
        let copy = opts.clone();
        assert!(copy.on_expired.is_some());
        assert!(copy.on_version_mismatch.is_none());

        let s = format!("{:?}", copy);
        assert!(s.contains("on_expired: true"));
    }
}
