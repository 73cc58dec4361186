use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::envelope::decode_event_value;
use super::event::StorageEvent;
use crate::host::StorageEventListener;

/// Callback invoked with `(new_value, old_value, url)` when a watched key changes.
pub type Listener = Arc<dyn Fn(Option<&Value>, Option<&Value>, Option<&str>) + Send + Sync>;

/// Wraps a closure into a [`Listener`]. Keep the returned handle around to pass it to `off`.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(Option<&Value>, Option<&Value>, Option<&str>) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Registry of change listeners keyed by fully-qualified storage key.
///
/// The bus receives every raw [`StorageEvent`] of the platform and fans it out to the
/// listeners registered for that key, in registration order.
#[derive(Default)]
pub struct ChangeEventBus {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
}

impl Debug for ChangeEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeEventBus").finish_non_exhaustive()
    }
}

impl ChangeEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `callback` for `key`. The same callback registered twice fires twice.
    pub fn on(&self, key: &str, callback: Listener) {
        self.lock().entry(key.to_string()).or_default().push(callback);
    }

    /// Removes the first registration of `callback` for `key`; unknown callbacks are ignored.
    pub fn off(&self, key: &str, callback: &Listener) {
        let mut guard = self.lock();
        let Some(list) = guard.get_mut(key) else { return };
        if let Some(pos) = list.iter().position(|l| same_listener(l, callback)) {
            list.remove(pos);
        }
    }

    /// Number of keys with a registry entry, including entries emptied by `off`.
    pub fn key_count(&self) -> usize {
        self.lock().len()
    }

    pub fn listener_count(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, Vec::len)
    }

    /// Delivers a platform notification to the listeners of its key.
    pub fn emit(&self, event: Option<&StorageEvent>) {
        let Some(event) = event else { return };
        let Some(key) = event.key.as_deref() else { return };

        // Snapshot so callbacks may register or remove listeners themselves.
        let listeners = match self.lock().get(key) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return,
        };

        let new_value = decode_event_value(event.new_value.as_deref());
        let old_value = decode_event_value(event.old_value.as_deref());
        log::trace!("storage event for {key:?} -> {} listener(s)", listeners.len());

        for l in &listeners {
            l(new_value.as_ref(), old_value.as_ref(), event.url.as_deref());
        }
    }
}

impl StorageEventListener for ChangeEventBus {
    fn handle_event(&self, event: &StorageEvent) {
        self.emit(Some(event));
    }
}
