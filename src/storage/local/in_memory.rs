use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use anyhow::Result;
use crate::storage::area::{LocalStore, StorageArea};
use crate::storage::memory::MemoryStorage;

/// In‑memory local storage (no persistence). Used when the host is not given a database file.
#[derive(Default)]
pub struct InMemoryLocalStore {
    areas: Mutex<HashMap<url::Origin, Arc<MemoryStorage>>>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for InMemoryLocalStore {
    fn area(&self, origin: &url::Origin) -> Result<Arc<dyn StorageArea>> {
        let mut guard = self.areas.lock().unwrap_or_else(PoisonError::into_inner);
        let area: Arc<dyn StorageArea> = guard.entry(origin.clone()).or_default().clone();
        Ok(area)
    }
}
