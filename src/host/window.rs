use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use url::Url;
use uuid::Uuid;

use super::{EventTarget, Host, Platform, StorageEventListener};
use crate::config::StorageKind;
use crate::storage::{StorageArea, StorageEvent};

/// A unique identifier for a window, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(Uuid);

impl WindowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type ListenerMap = HashMap<String, Vec<Arc<dyn StorageEventListener>>>;

/// An execution context of a [`Host`]: one document at one URL. Closing (dropping) the window
/// discards its session storage.
pub struct Window {
    id: WindowId,
    url: Url,
    origin: url::Origin,
    host: Arc<Host>,
    listeners: RwLock<ListenerMap>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl Window {
    pub(super) fn new(host: Arc<Host>, url: Url) -> Self {
        Self {
            id: WindowId::new(),
            origin: url.origin(),
            url,
            host,
            listeners: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn origin(&self) -> &url::Origin {
        &self.origin
    }

    /// Delivers `event` to every listener attached to the `name` channel.
    pub fn dispatch_event(&self, name: &str, event: &StorageEvent) {
        let listeners = match self.listeners.read().unwrap_or_else(PoisonError::into_inner).get(name) {
            Some(list) => list.clone(),
            None => return,
        };
        for l in listeners {
            l.handle_event(event);
        }
    }
}

impl EventTarget for Window {
    fn add_event_listener(&self, event: &str, listener: Arc<dyn StorageEventListener>) {
        let mut guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let list = guard.entry(event.to_string()).or_default();
        if !list.iter().any(|l| std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(&listener))) {
            list.push(listener);
        }
    }
}

impl Platform for Window {
    fn probe(&self, kind: StorageKind) -> Option<Arc<dyn StorageArea>> {
        if !self.origin.is_tuple() {
            log::debug!("window {} has an opaque origin, no {kind} storage", self.id);
            return None;
        }
        let area = self.host.area(kind, self.id, &self.origin)?;
        let area: Arc<dyn StorageArea> = match kind {
            StorageKind::Local => Arc::new(NotifyingArea {
                inner: area,
                host: self.host.clone(),
                source: self.id,
                origin: self.origin.clone(),
                url: self.url.to_string(),
            }),
            _ => area,
        };
        Some(area)
    }

    fn event_target(&self) -> &dyn EventTarget {
        self
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.host.close_window(self.id);
    }
}

/// Local area handed to one window; mutations are reported to the other windows of the origin.
struct NotifyingArea {
    inner: Arc<dyn StorageArea>,
    host: Arc<Host>,
    source: WindowId,
    origin: url::Origin,
    url: String,
}

impl NotifyingArea {
    fn notify(&self, key: Option<&str>, old_value: Option<String>, new_value: Option<String>) {
        let event = StorageEvent {
            key: key.map(str::to_string),
            old_value,
            new_value,
            url: Some(self.url.clone()),
        };
        self.host.broadcast(self.source, &self.origin, &event);
    }
}

impl StorageArea for NotifyingArea {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let old = self.inner.get_item(key);
        self.inner.set_item(key, value)?;
        if old.as_deref() != Some(value) {
            self.notify(Some(key), old, Some(value.to_string()));
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool> {
        let old = self.inner.get_item(key);
        let removed = self.inner.remove_item(key)?;
        if removed {
            self.notify(Some(key), old, None);
        }
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        if self.inner.is_empty() {
            return Ok(());
        }
        self.inner.clear()?;
        self.notify(None, None, None);
        Ok(())
    }

    fn key(&self, index: usize) -> Option<String> {
        self.inner.key(index)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
