use crate::host::WindowId;
use anyhow::Result;
use std::sync::Arc;

/// Object-safe key/value storage area (DOM's Storage). This is the backend contract every
/// bridge is built on.
pub trait StorageArea: Send + Sync {
    /// Retrieves the value associated with the given key, or `None` if not found.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Sets the value for the given key, overwriting any existing value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the item with the given key. Returns whether the key was present.
    fn remove_item(&self, key: &str) -> Result<bool>;

    /// Clears all items in the storage area.
    fn clear(&self) -> Result<()>;

    /// Returns the key at `index` in the area's iteration order, or `None` when out of range.
    fn key(&self, index: usize) -> Option<String>;

    /// Returns the number of items in the storage area.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store for localStorage-like areas (shared per origin).
pub trait LocalStore: Send + Sync {
    /// Retrieves the storage area for the given origin.
    fn area(&self, origin: &url::Origin) -> Result<Arc<dyn StorageArea>>;
}

/// Store for sessionStorage-like areas (isolated per (window, origin)).
pub trait SessionStore: Send + Sync {
    /// Retrieves the storage area for the given window and origin.
    fn area(&self, window: WindowId, origin: &url::Origin) -> Arc<dyn StorageArea>;

    /// Drops all session storage for the given window.
    fn drop_window(&self, window: WindowId);
}
