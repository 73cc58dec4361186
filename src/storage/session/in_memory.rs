use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use crate::host::WindowId;
use crate::storage::area::{SessionStore, StorageArea};
use crate::storage::memory::MemoryStorage;

// In memory storage, one area per (window, origin)
#[derive(Default)]
pub struct InMemorySessionStore {
    data: RwLock<HashMap<(WindowId, url::Origin), Arc<MemoryStorage>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn area(&self, window: WindowId, origin: &url::Origin) -> Arc<dyn StorageArea> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.entry((window, origin.clone())).or_default().clone()
    }

    fn drop_window(&self, window: WindowId) {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|(w, _), area| {
            if *w != window {
                return true;
            }
            // Handles still held elsewhere must not outlive the session's data.
            let _ = area.clear();
            false
        });
    }
}
