use anyhow::Result;
use std::collections::BTreeMap;

/// Object-safe key/value storage area (DOM's Storage).
///
/// This is the ambient store the accessors sit on. Implementations manage
/// their own synchronization; all methods take `&self`.
pub trait StorageArea: Send + Sync {
    /// Retrieves the value associated with the given key, or `None` if not found.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Sets the value for the given key, overwriting any existing value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the item with the given key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Clears all items in the storage area.
    fn clear(&self) -> Result<()>;

    /// Returns the number of items in the storage area.
    fn len(&self) -> usize;

    /// Returns a vector of all keys in the storage area.
    fn keys(&self) -> Vec<String>;
}

/// Length of the whole area serialized as a JSON object of `key: text` pairs.
///
/// This is a coarse diagnostic covering every key in the area, not only the
/// ones written through a particular accessor.
pub fn serialized_size(area: &dyn StorageArea) -> usize {
    let entries: BTreeMap<String, String> = area
        .keys()
        .into_iter()
        .filter_map(|k| area.get_item(&k).map(|v| (k, v)))
        .collect();

    match serde_json::to_string(&entries) {
        Ok(s) => s.len(),
        Err(e) => {
            log::warn!("cannot serialize storage area for size query: {e}");
            0
        }
    }
}
