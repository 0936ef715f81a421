use super::area::StorageArea;
use super::event::{StorageEvent, StorageScope};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel behind a [`NotifyingArea`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A handle for receiving storage change notifications.
pub type Subscription = broadcast::Receiver<StorageEvent>;

#[derive(Debug)]
struct StorageBus {
    tx: broadcast::Sender<StorageEvent>,
}

impl Default for StorageBus {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl StorageBus {
    fn subscribe(&self) -> Subscription {
        self.tx.subscribe()
    }
    fn publish(&self, ev: StorageEvent) {
        // send() only fails when nobody is listening
        let _ = self.tx.send(ev);
    }
}

/// Area decorator that publishes a [`StorageEvent`] for every mutation.
///
/// Reads pass straight through. Events are published after the inner area
/// accepted the change; a failed write publishes nothing.
pub struct NotifyingArea {
    inner: Arc<dyn StorageArea>,
    scope: StorageScope,
    bus: Arc<StorageBus>,
}

impl NotifyingArea {
    pub fn new(inner: Arc<dyn StorageArea>, scope: StorageScope) -> Self {
        Self {
            inner,
            scope,
            bus: Arc::new(StorageBus::default()),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    fn publish(&self, key: Option<&str>, old_value: Option<String>, new_value: Option<String>) {
        self.bus.publish(StorageEvent {
            scope: self.scope,
            key: key.map(str::to_string),
            old_value,
            new_value,
        });
    }
}

impl StorageArea for NotifyingArea {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let old = self.inner.get_item(key);
        self.inner.set_item(key, value)?;
        self.publish(Some(key), old, Some(value.to_string()));
        Ok(())
    }
    fn remove_item(&self, key: &str) -> Result<()> {
        let old = self.inner.get_item(key);
        self.inner.remove_item(key)?;
        self.publish(Some(key), old, None);
        Ok(())
    }
    fn clear(&self) -> Result<()> {
        self.inner.clear()?;
        self.publish(None, None, None);
        Ok(())
    }
    fn len(&self) -> usize {
        self.inner.len()
    }
    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}
