//! Versioned, expiring key/value accessor over a [`StorageArea`].
//!
//! Values are wrapped in a [`StoredEnvelope`] and written as JSON text. A
//! read resolves the envelope in a fixed order:
//!
//! 1. an expired envelope goes to the `on_expired` hook (or is evicted);
//!    the version is not looked at in that case,
//! 2. otherwise, if a version was requested and differs from the stored one,
//!    the envelope goes to the `on_version_mismatch` hook (or is evicted),
//! 3. otherwise the stored value is returned.
//!
//! A hook that answers [`Resolution::Replace`] gets its fields merged over
//! the stored envelope and the merged envelope goes back through `set`: its
//! `expire_at` is taken as a lifetime in milliseconds from now and its version
//! is kept. The merged value is returned. [`Resolution::Evict`] removes the entry and the read yields
//! `None`.
//!
//! When no area is attached (for instance a headless host without local
//! storage) every operation quietly does nothing.

use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::config::{ItemConfig, StorageConfig};
use crate::errors::Result;
use crate::prefix::compute_effective_key;
use crate::storage::area::{serialized_size, StorageArea};
use crate::storage::envelope::{Resolution, StoredEnvelope};
use crate::storage::options::AccessOptions;

/// Current wall-clock time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    let ms = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Whole milliseconds of `ttl`, saturated to the `i64` range.
fn ttl_millis(ttl: Duration) -> i64 {
    let ms = ttl.whole_milliseconds();
    i64::try_from(ms).unwrap_or(if ms < 0 { i64::MIN } else { i64::MAX })
}

/// Absolute expiry for a lifetime of `ttl_ms` starting now.
fn expire_after(ttl_ms: i64) -> i64 {
    now_millis().saturating_add(ttl_ms)
}

/// Local storage context: the "static" API plus the global default config.
///
/// Cloning is cheap and clones share both the area and the defaults.
#[derive(Clone)]
pub struct LocalStorage {
    area: Option<Arc<dyn StorageArea>>,
    defaults: Arc<RwLock<StorageConfig>>,
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage")
            .field("available", &self.area.is_some())
            .finish_non_exhaustive()
    }
}

impl LocalStorage {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self {
            area: Some(area),
            defaults: Arc::new(RwLock::new(StorageConfig::default())),
        }
    }

    /// A context without a backing area. Every operation is a no-op.
    pub fn unavailable() -> Self {
        Self {
            area: None,
            defaults: Arc::new(RwLock::new(StorageConfig::default())),
        }
    }

    /// Whether an area is attached and operations reach it.
    pub fn ensure_available(&self) -> bool {
        self.area.is_some()
    }

    /// Writes `value` under `key`, replacing whatever was there.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, options: &AccessOptions<T>) -> Result<()> {
        let Some(area) = &self.area else { return Ok(()) };

        let ttl_ms = options.ttl.map(ttl_millis);
        write_envelope(area.as_ref(), key, value, ttl_ms, options.version.clone())
    }

    /// Reads the value under `key`, resolving expiry and version mismatches.
    pub fn get<T>(&self, key: &str, options: &AccessOptions<T>) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let Some(area) = &self.area else { return Ok(None) };

        let text = match area.get_item(key) {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(None),
        };
        let envelope: StoredEnvelope<T> = serde_json::from_str(&text)?;

        if envelope.is_expired_at(now_millis()) {
            let (view, version) = envelope.into_expired_view();
            let resolution = match &options.on_expired {
                Some(hook) => hook(view),
                None => Resolution::Evict,
            };
            return match resolution {
                Resolution::Replace(replacement) => {
                    log::debug!("expired entry {key:?} replaced by hook");
                    let merged = replacement.merge(version);
                    let (ttl_ms, version) = (merged.expire_at, merged.version);
                    write_envelope(area.as_ref(), key, &merged.value, ttl_ms, version)?;
                    Ok(Some(merged.value))
                }
                Resolution::Evict => {
                    log::debug!("evicting expired entry {key:?}");
                    area.remove_item(key)?;
                    Ok(None)
                }
            };
        }

        if let Some(requested) = options.version.as_deref().filter(|v| !v.is_empty()) {
            if envelope.version_mismatches(requested) {
                let (view, expire_at) = envelope.into_versioned_view();
                let resolution = match &options.on_version_mismatch {
                    Some(hook) => hook(view, requested),
                    None => Resolution::Evict,
                };
                return match resolution {
                    Resolution::Replace(replacement) => {
                        log::debug!("version mismatch on {key:?} resolved by hook");
                        let merged = replacement.merge(expire_at);
                        let (ttl_ms, version) = (merged.expire_at, merged.version);
                        write_envelope(area.as_ref(), key, &merged.value, ttl_ms, version)?;
                        Ok(Some(merged.value))
                    }
                    Resolution::Evict => {
                        log::debug!("evicting {key:?}: version {requested:?} requested");
                        area.remove_item(key)?;
                        Ok(None)
                    }
                };
            }
        }

        Ok(Some(envelope.value))
    }

    /// Removes the entry under `key`. Missing keys are fine.
    pub fn remove(&self, key: &str) -> Result<()> {
        let Some(area) = &self.area else { return Ok(()) };
        area.remove_item(key)?;
        Ok(())
    }

    /// Approximate size of the whole area, see [`serialized_size`].
    pub fn size(&self) -> usize {
        match &self.area {
            Some(area) => serialized_size(area.as_ref()),
            None => 0,
        }
    }

    /// Wipes the **entire** area, including keys this accessor never wrote.
    pub fn clear(&self) -> Result<()> {
        let Some(area) = &self.area else { return Ok(()) };
        area.clear()?;
        Ok(())
    }

    /// Snapshot of the current global defaults.
    pub fn global_config(&self) -> StorageConfig {
        self.defaults.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the global defaults. Existing items are unaffected.
    pub fn set_global_config(&self, config: StorageConfig) {
        *self.defaults.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Mutates the global defaults in place. Existing items are unaffected.
    pub fn update_global_config(&self, f: impl FnOnce(&mut StorageConfig)) {
        f(&mut self.defaults.write().unwrap_or_else(PoisonError::into_inner));
    }

    /// Binds `key` to a typed item using the current global defaults.
    pub fn item<T>(
        &self,
        key: &str,
        default: Option<T>,
        config: ItemConfig<AccessOptions<T>>,
    ) -> LocalItem<T> {
        let defaults = self.global_config();
        let (prefix, options) = config.take_prefix(&defaults.prefix);

        LocalItem {
            storage: self.clone(),
            key: key.to_string(),
            effective_key: compute_effective_key(key, &prefix),
            default,
            options: options.over_defaults(&defaults),
        }
    }
}

/// The write half of `set`: `ttl_ms` is a lifetime from now, not an instant.
fn write_envelope<T: Serialize>(
    area: &dyn StorageArea,
    key: &str,
    value: &T,
    ttl_ms: Option<i64>,
    version: Option<String>,
) -> Result<()> {
    let envelope = StoredEnvelope {
        value,
        expire_at: ttl_ms.map(expire_after),
        version,
    };
    let text = serde_json::to_string(&envelope)?;
    log::trace!("set {key:?} ({} bytes)", text.len());
    area.set_item(key, &text)?;
    Ok(())
}

/// A key bound to a [`LocalStorage`] with a default value and fixed options.
///
/// The effective key and options are resolved once, at construction.
pub struct LocalItem<T> {
    storage: LocalStorage,
    key: String,
    effective_key: String,
    default: Option<T>,
    options: AccessOptions<T>,
}

impl<T> LocalItem<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Stored value, or the default when nothing usable is stored.
    pub fn get(&self) -> Result<Option<T>> {
        let stored = self.storage.get(&self.effective_key, &self.options)?;
        Ok(stored.or_else(|| self.default.clone()))
    }

    pub fn set(&self, value: &T) -> Result<()> {
        self.storage.set(&self.effective_key, value, &self.options)
    }

    pub fn remove(&self) -> Result<()> {
        self.storage.remove(&self.effective_key)
    }
}

impl<T> LocalItem<T> {
    /// The raw key as given at construction.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The key actually used in the area.
    pub fn effective_key(&self) -> &str {
        &self.effective_key
    }

    pub fn options(&self) -> &AccessOptions<T> {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use crate::prefix::Prefix;
    use crate::storage::envelope::{ExpiredEntry, VersionedEntry};
    use crate::storage::InMemoryArea;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::Duration;

    fn storage() -> (LocalStorage, Arc<InMemoryArea>) {
        let area = Arc::new(InMemoryArea::new());
        (LocalStorage::new(area.clone()), area)
    }

    fn none<T>() -> AccessOptions<T> {
        AccessOptions::new()
    }

    #[test]
    fn set_and_get_round_trip() {
        let (ls, _) = storage();
        ls.set("key1", &"value1".to_string(), &none()).unwrap();
        assert_eq!(ls.get::<String>("key1", &none()).unwrap().as_deref(), Some("value1"));

        let list = vec![1, 2, 3];
        ls.set("list", &list, &none()).unwrap();
        assert_eq!(ls.get::<Vec<i32>>("list", &none()).unwrap(), Some(list));
    }

    #[test]
    fn never_written_key_is_none() {
        let (ls, _) = storage();
        assert!(ls.get::<String>("nope", &none()).unwrap().is_none());
    }

    #[test]
    fn removed_key_is_none() {
        let (ls, _) = storage();
        ls.set("key2", &"value2".to_string(), &none()).unwrap();
        ls.remove("key2").unwrap();
        ls.remove("key2").unwrap();
        assert!(ls.get::<String>("key2", &none()).unwrap().is_none());
    }

    #[test]
    fn expired_entry_without_hook_is_evicted() {
        let (ls, area) = storage();
        ls.set("keyExpire", &"valueExpire".to_string(), &none().ttl(Duration::milliseconds(-1)))
            .unwrap();
        assert!(area.get_item("keyExpire").is_some());

        assert!(ls.get::<String>("keyExpire", &none()).unwrap().is_none());
        assert!(area.get_item("keyExpire").is_none());
    }

    #[test]
    fn unexpired_entry_is_returned() {
        let (ls, _) = storage();
        ls.set("k", &1u8, &none().ttl(Duration::hours(1))).unwrap();
        assert_eq!(ls.get::<u8>("k", &none()).unwrap(), Some(1));
    }

    #[test]
    fn version_mismatch_without_hook_is_evicted() {
        let (ls, area) = storage();
        ls.set("keyVersion", &"valueVersion".to_string(), &none().version("1.0")).unwrap();

        assert!(ls.get::<String>("keyVersion", &none().version("2.0")).unwrap().is_none());
        assert!(area.get_item("keyVersion").is_none());
    }

    #[test]
    fn matching_or_unrequested_version_reads_value() {
        let (ls, _) = storage();
        ls.set("k", &"v".to_string(), &none().version("1.0")).unwrap();
        assert_eq!(ls.get::<String>("k", &none().version("1.0")).unwrap().as_deref(), Some("v"));
        assert_eq!(ls.get::<String>("k", &none()).unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn unversioned_entry_mismatches_requested_version() {
        let (ls, _) = storage();
        ls.set("k", &"v".to_string(), &none()).unwrap();
        assert!(ls.get::<String>("k", &none().version("1.0")).unwrap().is_none());
    }

    #[test]
    fn expired_hook_replacement_is_persisted() {
        let (ls, area) = storage();
        ls.set("k", &"old".to_string(), &none().ttl(Duration::milliseconds(-1)).version("1"))
            .unwrap();

        let opts = none::<String>().on_expired(|entry| {
            assert_eq!(entry.value, "old");
            Resolution::Replace(ExpiredEntry { value: "renewed".to_string(), expire_at: None })
        });
        assert_eq!(ls.get("k", &opts).unwrap().as_deref(), Some("renewed"));

        // merged envelope kept the version and dropped the expiry
        let stored: StoredEnvelope<String> =
            serde_json::from_str(&area.get_item("k").unwrap()).unwrap();
        assert_eq!(stored.value, "renewed");
        assert_eq!(stored.version.as_deref(), Some("1"));
        assert!(stored.expire_at.is_none());

        assert_eq!(ls.get("k", &opts).unwrap().as_deref(), Some("renewed"));
    }

    #[test]
    fn expired_hook_replacement_is_rewritten_through_set() {
        let (ls, area) = storage();
        ls.set("k", &1u32, &none().ttl(Duration::milliseconds(-1))).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let opts = none::<u32>().on_expired(move |entry| {
            counter.fetch_add(1, Ordering::SeqCst);
            Resolution::Replace(ExpiredEntry { value: 7, ..entry })
        });

        assert_eq!(ls.get("k", &opts).unwrap(), Some(7));

        // the kept expiry was fed back as a lifetime, so the entry is live again
        let stored: StoredEnvelope<u32> =
            serde_json::from_str(&area.get_item("k").unwrap()).unwrap();
        assert!(!stored.is_expired_at(now_millis()));

        assert_eq!(ls.get("k", &none()).unwrap(), Some(7));
        assert_eq!(ls.get("k", &opts).unwrap(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn huge_ttl_saturates_instead_of_wrapping() {
        let (ls, area) = storage();
        ls.set("k", &1u8, &none().ttl(Duration::MAX)).unwrap();
        assert_eq!(ls.get::<u8>("k", &none()).unwrap(), Some(1));

        let stored: StoredEnvelope<u8> =
            serde_json::from_str(&area.get_item("k").unwrap()).unwrap();
        assert_eq!(stored.expire_at, Some(i64::MAX));

        ls.set("gone", &1u8, &none().ttl(Duration::MIN)).unwrap();
        assert!(ls.get::<u8>("gone", &none()).unwrap().is_none());
    }

    #[test]
    fn unencodable_value_is_a_serialization_error() {
        use std::collections::HashMap;

        let (ls, area) = storage();
        let value: HashMap<(u8, u8), u8> = HashMap::from([((1, 2), 3)]);
        let err = ls.set("k", &value, &none()).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
        assert!(area.get_item("k").is_none());
        assert_eq!(area.len(), 0);
    }

    #[test]
    fn empty_requested_version_skips_the_check() {
        let (ls, area) = storage();
        ls.set("k", &"v".to_string(), &none()).unwrap();
        assert_eq!(ls.get::<String>("k", &none().version("")).unwrap().as_deref(), Some("v"));
        assert!(area.get_item("k").is_some());
    }

    #[test]
    fn expired_hook_evict_removes_entry() {
        let (ls, area) = storage();
        ls.set("k", &"v".to_string(), &none().ttl(Duration::milliseconds(-1))).unwrap();

        let opts = none::<String>().on_expired(|_| Resolution::Evict);
        assert!(ls.get("k", &opts).unwrap().is_none());
        assert!(area.get_item("k").is_none());
    }

    #[test]
    fn expiry_takes_priority_over_version() {
        let (ls, area) = storage();
        ls.set("k", &"v".to_string(), &none().ttl(Duration::milliseconds(-1)).version("1"))
            .unwrap();

        let version_calls = Arc::new(AtomicUsize::new(0));
        let counter = version_calls.clone();
        let opts = none::<String>()
            .version("2")
            .on_version_mismatch(move |entry, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Resolution::Replace(entry)
            });

        assert!(ls.get("k", &opts).unwrap().is_none());
        assert_eq!(version_calls.load(Ordering::SeqCst), 0);
        assert!(area.get_item("k").is_none());
    }

    #[test]
    fn version_hook_migrates_through_set() {
        let (ls, area) = storage();
        ls.set("k", &10u32, &none().ttl(Duration::hours(1)).version("1")).unwrap();
        let before: StoredEnvelope<u32> =
            serde_json::from_str(&area.get_item("k").unwrap()).unwrap();

        let opts = none::<u32>().version("2").on_version_mismatch(|entry, requested| {
            assert_eq!(entry.version.as_deref(), Some("1"));
            Resolution::Replace(VersionedEntry {
                value: entry.value * 2,
                version: Some(requested.to_string()),
            })
        });

        assert_eq!(ls.get("k", &opts).unwrap(), Some(20));

        let after: StoredEnvelope<u32> =
            serde_json::from_str(&area.get_item("k").unwrap()).unwrap();
        assert_eq!(after.version.as_deref(), Some("2"));
        // kept expiry went back through `set` as a lifetime
        assert!(after.expire_at.unwrap() > before.expire_at.unwrap());

        // now matches, hook not needed
        assert_eq!(ls.get("k", &none().version("2")).unwrap(), Some(20));
    }

    #[test]
    fn version_hook_evict_removes_entry() {
        let (ls, area) = storage();
        ls.set("k", &"v".to_string(), &none().version("1")).unwrap();
        let opts = none::<String>().version("2").on_version_mismatch(|_, _| Resolution::Evict);
        assert!(ls.get("k", &opts).unwrap().is_none());
        assert!(area.get_item("k").is_none());
    }

    #[test]
    fn malformed_text_is_a_serialization_error() {
        let (ls, area) = storage();
        area.set_item("bad", "{not json").unwrap();
        let err = ls.get::<String>("bad", &none()).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));

        // wrong shape is rejected the same way
        area.set_item("shape", r#"{"value":"text"}"#).unwrap();
        assert!(ls.get::<u32>("shape", &none()).is_err());
    }

    #[test]
    fn empty_text_reads_as_missing() {
        let (ls, area) = storage();
        area.set_item("blank", "").unwrap();
        assert!(ls.get::<String>("blank", &none()).unwrap().is_none());
    }

    #[test]
    fn size_and_clear_cover_whole_area() {
        let (ls, area) = storage();
        assert_eq!(ls.size(), 2);

        ls.set("keySize", &"valueSize".to_string(), &none()).unwrap();
        area.set_item("foreign", "x").unwrap();
        assert!(ls.size() > 2);

        ls.clear().unwrap();
        assert_eq!(area.len(), 0);
    }

    #[test]
    fn unavailable_store_degrades_silently() {
        let ls = LocalStorage::unavailable();
        assert!(!ls.ensure_available());
        ls.set("k", &"v".to_string(), &none()).unwrap();
        assert!(ls.get::<String>("k", &none()).unwrap().is_none());
        ls.remove("k").unwrap();
        ls.clear().unwrap();
        assert_eq!(ls.size(), 0);

        let item = ls.item("k", Some("fallback".to_string()), ItemConfig::default());
        item.set(&"ignored".to_string()).unwrap();
        assert_eq!(item.get().unwrap().as_deref(), Some("fallback"));
    }

    #[test]
    fn item_uses_global_prefix_and_version() {
        let (ls, _) = storage();
        ls.set_global_config(
            StorageConfig::builder().prefix("global").version("1.0").build().unwrap(),
        );

        let item = ls.item("instanceKey", Some("defaultValue".to_string()), ItemConfig::default());
        item.set(&"valueInstance".to_string()).unwrap();

        assert_eq!(item.key(), "instanceKey");
        assert_eq!(item.effective_key(), "global_instanceKey");
        assert_eq!(
            ls.get::<String>("global_instanceKey", &none()).unwrap().as_deref(),
            Some("valueInstance")
        );
        // written with the global version
        assert!(ls.get::<String>("global_instanceKey", &none().version("2.0")).unwrap().is_none());
    }

    #[test]
    fn item_default_is_returned_and_never_persisted() {
        let (ls, area) = storage();
        let item = ls.item("instanceKeyDefault", Some("defaultValue".to_string()), ItemConfig::default());
        assert_eq!(item.get().unwrap().as_deref(), Some("defaultValue"));
        assert_eq!(area.len(), 0);

        let bare: LocalItem<String> = ls.item("noDefault", None, ItemConfig::default());
        assert!(bare.get().unwrap().is_none());
    }

    #[test]
    fn item_set_get_remove() {
        let (ls, _) = storage();
        let item: LocalItem<String> = ls.item("instanceKey2", None, ItemConfig::default());
        item.set(&"valueInstance2".to_string()).unwrap();
        assert_eq!(item.get().unwrap().as_deref(), Some("valueInstance2"));
        item.remove().unwrap();
        assert!(item.get().unwrap().is_none());
    }

    #[test]
    fn item_config_overrides_globals() {
        let (ls, _) = storage();
        ls.set_global_config(
            StorageConfig::builder().prefix("global").version("1.0").build().unwrap(),
        );

        let item: LocalItem<u8> = ls.item(
            "k",
            None,
            ItemConfig::new(AccessOptions::new().version("3.0"))
                .with_prefix(Prefix::transform(|k| format!("{}!", k.to_uppercase()))),
        );
        assert_eq!(item.effective_key(), "K!");
        assert_eq!(item.options().version.as_deref(), Some("3.0"));
    }

    #[test]
    fn global_change_after_construction_does_not_leak_into_item() {
        let (ls, _) = storage();
        let item: LocalItem<String> = ls.item("k", None, ItemConfig::default());

        ls.update_global_config(|c| {
            c.prefix = Prefix::literal("late");
            c.version = Some("9".into());
        });

        assert_eq!(item.effective_key(), "k");
        assert!(item.options().version.is_none());

        let later: LocalItem<String> = ls.item("k", None, ItemConfig::default());
        assert_eq!(later.effective_key(), "late_k");
        assert_eq!(later.options().version.as_deref(), Some("9"));
    }

    #[test]
    fn item_ttl_from_config_expires_to_default() {
        let (ls, area) = storage();
        let item = ls.item(
            "session",
            Some(0u32),
            ItemConfig::new(AccessOptions::new().ttl(Duration::milliseconds(-1))),
        );
        item.set(&42).unwrap();
        assert_eq!(item.get().unwrap(), Some(0));
        assert!(area.get_item("session").is_none());
    }
}
