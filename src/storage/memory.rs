use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use anyhow::Result;

use crate::storage::area::StorageArea;

/// In‑memory storage area (no persistence). Used as the fallback whenever no native storage is
/// available, and as the backing map of the in-memory local and session stores.
///
/// Keys are iterated in insertion order; overwriting an existing key keeps its position.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<Entries>,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, String>,
    order: Vec<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.lock().map.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock();
        if entries.map.insert(key.to_string(), value.to_string()).is_none() {
            entries.order.push(key.to_string());
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool> {
        let mut entries = self.lock();
        if entries.map.remove(key).is_none() {
            return Ok(false);
        }
        entries.order.retain(|k| k != key);
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.lock();
        entries.map.clear();
        entries.order.clear();
        Ok(())
    }

    fn key(&self, index: usize) -> Option<String> {
        self.lock().order.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.lock().map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_contract() {
        let store = MemoryStorage::new();

        assert_eq!(store.len(), 0);
        assert!(store.get_item("missing").is_none());

        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_item("a").as_deref(), Some("1"));

        // remove reports presence
        assert!(store.remove_item("a").unwrap());
        assert!(!store.remove_item("a").unwrap());
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert_eq!(store.len(), 0);
        assert!(store.key(0).is_none());
    }

    #[test]
    fn keys_follow_insertion_order() {
        let store = MemoryStorage::new();
        for k in ["zeta", "alpha", "mid"] {
            store.set_item(k, "v").unwrap();
        }
        assert_eq!(store.key(0).as_deref(), Some("zeta"));
        assert_eq!(store.key(1).as_deref(), Some("alpha"));
        assert_eq!(store.key(2).as_deref(), Some("mid"));
        assert!(store.key(3).is_none());

        // overwrite keeps the slot, removal closes the gap
        store.set_item("zeta", "w").unwrap();
        assert_eq!(store.key(0).as_deref(), Some("zeta"));
        store.remove_item("alpha").unwrap();
        assert_eq!(store.key(1).as_deref(), Some("mid"));
        assert!(store.key(2).is_none());
    }

    #[test]
    fn len_is_computed_on_access() {
        let store = MemoryStorage::new();
        store.set_item("x", "1").unwrap();
        let before = store.len();
        store.set_item("y", "2").unwrap();
        assert_eq!(before, 1);
        assert_eq!(store.len(), 2);
    }
}
