//! Plain session storage accessor: values wrapped in a bare `{value}` envelope,
//! no expiry and no versioning.

use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ItemConfig, SessionConfig};
use crate::errors::Result;
use crate::prefix::compute_effective_key;
use crate::storage::area::{serialized_size, StorageArea};
use crate::storage::envelope::StoredEnvelope;

#[derive(Clone)]
pub struct SessionStorage {
    area: Option<Arc<dyn StorageArea>>,
    defaults: Arc<RwLock<SessionConfig>>,
}

impl std::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStorage")
            .field("available", &self.area.is_some())
            .finish_non_exhaustive()
    }
}

impl SessionStorage {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self {
            area: Some(area),
            defaults: Arc::new(RwLock::new(SessionConfig::default())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            area: None,
            defaults: Arc::new(RwLock::new(SessionConfig::default())),
        }
    }

    pub fn ensure_available(&self) -> bool {
        self.area.is_some()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let Some(area) = &self.area else { return Ok(()) };
        let text = serde_json::to_string(&StoredEnvelope::new(value))?;
        area.set_item(key, &text)?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(area) = &self.area else { return Ok(None) };
        match area.get_item(key) {
            Some(text) if !text.is_empty() => {
                let envelope: StoredEnvelope<T> = serde_json::from_str(&text)?;
                Ok(Some(envelope.value))
            }
            _ => Ok(None),
        }
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let Some(area) = &self.area else { return Ok(()) };
        area.remove_item(key)?;
        Ok(())
    }

    pub fn size(&self) -> usize {
        match &self.area {
            Some(area) => serialized_size(area.as_ref()),
            None => 0,
        }
    }

    /// Wipes the entire area.
    pub fn clear(&self) -> Result<()> {
        let Some(area) = &self.area else { return Ok(()) };
        area.clear()?;
        Ok(())
    }

    pub fn global_config(&self) -> SessionConfig {
        self.defaults.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_global_config(&self, config: SessionConfig) {
        *self.defaults.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn item<T>(&self, key: &str, default: Option<T>, config: ItemConfig<()>) -> SessionItem<T> {
        let (prefix, ()) = config.take_prefix(&self.global_config().prefix);
        SessionItem {
            storage: self.clone(),
            key: key.to_string(),
            effective_key: compute_effective_key(key, &prefix),
            default,
        }
    }
}

pub struct SessionItem<T> {
    storage: SessionStorage,
    key: String,
    effective_key: String,
    default: Option<T>,
}

impl<T> SessionItem<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn get(&self) -> Result<Option<T>> {
        Ok(self.storage.get(&self.effective_key)?.or_else(|| self.default.clone()))
    }

    pub fn set(&self, value: &T) -> Result<()> {
        self.storage.set(&self.effective_key, value)
    }

    pub fn remove(&self) -> Result<()> {
        self.storage.remove(&self.effective_key)
    }
}

impl<T> SessionItem<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn effective_key(&self) -> &str {
        &self.effective_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryArea;

    fn storage() -> (SessionStorage, Arc<InMemoryArea>) {
        let area = Arc::new(InMemoryArea::new());
        (SessionStorage::new(area.clone()), area)
    }

    #[test]
    fn round_trip_uses_bare_envelope() {
        let (ss, area) = storage();
        ss.set("k", &"v".to_string()).unwrap();
        assert_eq!(area.get_item("k").as_deref(), Some(r#"{"value":"v"}"#));
        assert_eq!(ss.get::<String>("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn missing_and_removed_keys_are_none() {
        let (ss, _) = storage();
        assert!(ss.get::<u8>("k").unwrap().is_none());
        ss.set("k", &1u8).unwrap();
        ss.remove("k").unwrap();
        assert!(ss.get::<u8>("k").unwrap().is_none());
    }

    #[test]
    fn size_and_clear() {
        let (ss, area) = storage();
        ss.set("a", &true).unwrap();
        assert!(ss.size() > 2);
        ss.clear().unwrap();
        assert_eq!(area.len(), 0);
    }

    #[test]
    fn item_prefix_and_default() {
        let (ss, _) = storage();
        ss.set_global_config(SessionConfig::new("tab").unwrap());

        let item = ss.item("draft", Some(String::new()), ItemConfig::default());
        assert_eq!(item.key(), "draft");
        assert_eq!(item.effective_key(), "tab_draft");
        assert_eq!(item.get().unwrap().as_deref(), Some(""));

        item.set(&"hello".to_string()).unwrap();
        assert_eq!(ss.get::<String>("tab_draft").unwrap().as_deref(), Some("hello"));

        // later global change leaves the item alone
        ss.set_global_config(SessionConfig::default());
        assert_eq!(item.effective_key(), "tab_draft");
        item.remove().unwrap();
        assert_eq!(item.get().unwrap().as_deref(), Some(""));
    }

    #[test]
    fn unavailable_is_silent() {
        let ss = SessionStorage::unavailable();
        assert!(!ss.ensure_available());
        ss.set("k", &1).unwrap();
        assert!(ss.get::<i32>("k").unwrap().is_none());
        assert_eq!(ss.size(), 0);
    }
}
