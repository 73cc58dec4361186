//! The platform a bridge runs on.
//!
//! A [`Host`] plays the part of a browser profile: it owns the durable
//! [`LocalStore`] (one area per origin) and the [`SessionStore`] (one area per
//! window and origin), and it knows every open [`Window`]. A window is an
//! execution context with a URL. It hands out storage areas through a
//! capability probe and acts as the event target on which `storage` events are
//! delivered.
//!
//! Mutating a window's local area makes the host dispatch a `storage`
//! [`StorageEvent`] to every *other* open window of the same origin, which is
//! how bridges in different contexts learn about each other's writes.
//!
//! # Example
//!
//! ```rust
//! use webstorage::host::{Host, Platform};
//! use webstorage::storage::StorageArea;
//! use webstorage::config::StorageKind;
//!
//! let host = Host::builder().build();
//! let a = host.open_window("https://example.com/a").unwrap();
//! let b = host.open_window("https://example.com/b").unwrap();
//!
//! a.probe(StorageKind::Local).unwrap().set_item("k", "v").unwrap();
//! assert_eq!(b.probe(StorageKind::Local).unwrap().get_item("k").as_deref(), Some("v"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::config::StorageKind;
use crate::errors::StorageError;
use crate::storage::{InMemoryLocalStore, InMemorySessionStore, LocalStore, SessionStore, StorageArea, StorageEvent};

mod window;

pub use window::{Window, WindowId};

/// Receives raw platform storage events.
pub trait StorageEventListener: Send + Sync {
    fn handle_event(&self, event: &StorageEvent);
}

/// Subscribable platform notification channel.
pub trait EventTarget: Send + Sync {
    /// Attaches `listener` to the `event` channel. Attaching the same listener twice to the same
    /// event has no further effect.
    fn add_event_listener(&self, event: &str, listener: Arc<dyn StorageEventListener>);
}

/// What a bridge needs from its environment: native storage and an event target.
pub trait Platform: Send + Sync {
    /// Returns the native area for `kind`, or `None` when it does not exist or access is denied.
    /// `StorageKind::Memory` is never native and always yields `None`.
    fn probe(&self, kind: StorageKind) -> Option<Arc<dyn StorageArea>>;

    fn event_target(&self) -> &dyn EventTarget;
}

/// Which native storages the host refuses to hand out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    pub deny_local: bool,
    pub deny_session: bool,
}

impl AccessPolicy {
    pub fn deny_all() -> Self {
        Self { deny_local: true, deny_session: true }
    }

    fn allows(&self, kind: StorageKind) -> bool {
        match kind {
            StorageKind::Local => !self.deny_local,
            StorageKind::Session => !self.deny_session,
            StorageKind::Memory => true,
        }
    }
}

pub struct Host {
    local: Option<Arc<dyn LocalStore>>,
    session: Option<Arc<dyn SessionStore>>,
    policy: AccessPolicy,
    windows: RwLock<HashMap<WindowId, Weak<Window>>>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("local", &self.local.is_some())
            .field("session", &self.session.is_some())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    /// Opens a new execution context at `url`.
    pub fn open_window(self: &Arc<Self>, url: &str) -> Result<Arc<Window>, StorageError> {
        let url = url::Url::parse(url)?;
        let window = Arc::new(Window::new(self.clone(), url));
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(window.id(), Arc::downgrade(&window));
        log::debug!("opened window {} at {}", window.id(), window.url());
        Ok(window)
    }

    pub fn window_count(&self) -> usize {
        self.windows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn close_window(&self, id: WindowId) {
        self.windows.write().unwrap_or_else(PoisonError::into_inner).remove(&id);
        if let Some(session) = &self.session {
            session.drop_window(id);
        }
    }

    pub(crate) fn area(&self, kind: StorageKind, window: WindowId, origin: &url::Origin) -> Option<Arc<dyn StorageArea>> {
        if !self.policy.allows(kind) {
            log::debug!("access to {kind} storage denied by host policy");
            return None;
        }
        match kind {
            StorageKind::Local => match self.local.as_ref()?.area(origin) {
                Ok(area) => Some(area),
                Err(e) => {
                    log::error!("cannot open local storage for {}: {e}", origin.ascii_serialization());
                    None
                }
            },
            StorageKind::Session => Some(self.session.as_ref()?.area(window, origin)),
            StorageKind::Memory => None,
        }
    }

    /// Dispatches a `storage` event to every open window of `origin` except `source`.
    pub(crate) fn broadcast(&self, source: WindowId, origin: &url::Origin, event: &StorageEvent) {
        // Upgraded handles are dropped only after the lock is released; dropping the last one
        // closes the window, which takes the write lock.
        let others: Vec<Arc<Window>> = self
            .windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(id, _)| **id != source)
            .filter_map(|(_, w)| w.upgrade())
            .collect();

        for window in others.iter().filter(|w| w.origin() == origin) {
            window.dispatch_event(crate::config::STORAGE_EVENT, event);
        }
    }
}

/// Builder for [`Host`]. By default both local and session storage are kept in memory.
pub struct HostBuilder {
    local: Option<Arc<dyn LocalStore>>,
    session: Option<Arc<dyn SessionStore>>,
    policy: AccessPolicy,
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self {
            local: Some(Arc::new(InMemoryLocalStore::new())),
            session: Some(Arc::new(InMemorySessionStore::new())),
            policy: AccessPolicy::default(),
        }
    }
}

impl HostBuilder {
    pub fn local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local = Some(store);
        self
    }

    /// Persists local storage in the SQLite database at `path`.
    #[cfg(feature = "sqlite_local_store")]
    pub fn sqlite_local_store(self, path: &str) -> anyhow::Result<Self> {
        let store = crate::storage::SqliteLocalStore::new(path)?;
        Ok(self.local_store(Arc::new(store)))
    }

    /// Host without any durable storage.
    pub fn without_local_store(mut self) -> Self {
        self.local = None;
        self
    }

    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session = Some(store);
        self
    }

    pub fn without_session_store(mut self) -> Self {
        self.session = None;
        self
    }

    pub fn policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> Arc<Host> {
        Arc::new(Host {
            local: self.local,
            session: self.session,
            policy: self.policy,
            windows: RwLock::new(HashMap::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<StorageEvent>>);

    impl StorageEventListener for Recorder {
        fn handle_event(&self, event: &StorageEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn local_writes_notify_other_windows_of_the_same_origin() {
        let host = Host::builder().build();
        let a = host.open_window("https://example.com/a").unwrap();
        let b = host.open_window("https://example.com/b").unwrap();
        let other = host.open_window("https://other.test/").unwrap();

        let (ra, rb, ro) = (Arc::new(Recorder::default()), Arc::new(Recorder::default()), Arc::new(Recorder::default()));
        a.add_event_listener("storage", ra.clone());
        b.add_event_listener("storage", rb.clone());
        other.add_event_listener("storage", ro.clone());

        let area = a.probe(StorageKind::Local).unwrap();
        area.set_item("k", "1").unwrap();
        area.set_item("k", "2").unwrap();
        area.set_item("k", "2").unwrap(); // unchanged, no event
        area.remove_item("k").unwrap();
        area.remove_item("k").unwrap(); // absent, no event

        assert!(ra.0.lock().unwrap().is_empty());
        assert!(ro.0.lock().unwrap().is_empty());

        let seen = rb.0.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], StorageEvent::changed("k", None, Some("1".into())).with_url("https://example.com/a"));
        assert_eq!(seen[1].old_value.as_deref(), Some("1"));
        assert_eq!(seen[1].new_value.as_deref(), Some("2"));
        assert_eq!(seen[2].new_value, None);
    }

    #[test]
    fn clear_notifies_without_key() {
        let host = Host::builder().build();
        let a = host.open_window("https://example.com/").unwrap();
        let b = host.open_window("https://example.com/").unwrap();
        let rb = Arc::new(Recorder::default());
        b.add_event_listener("storage", rb.clone());

        let area = a.probe(StorageKind::Local).unwrap();
        area.clear().unwrap(); // empty, nothing to report
        area.set_item("k", "v").unwrap();
        area.clear().unwrap();

        let seen = rb.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].key, None);
    }

    #[test]
    fn listeners_are_deduplicated_per_event() {
        let host = Host::builder().build();
        let a = host.open_window("https://example.com/").unwrap();
        let b = host.open_window("https://example.com/").unwrap();
        let rb = Arc::new(Recorder::default());
        b.add_event_listener("storage", rb.clone());
        b.add_event_listener("storage", rb.clone());

        a.probe(StorageKind::Local).unwrap().set_item("k", "v").unwrap();
        assert_eq!(rb.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn policy_and_missing_stores_make_probe_fail() {
        let denied = Host::builder().policy(AccessPolicy { deny_local: true, deny_session: false }).build();
        let w = denied.open_window("https://example.com/").unwrap();
        assert!(w.probe(StorageKind::Local).is_none());
        assert!(w.probe(StorageKind::Session).is_some());
        assert!(w.probe(StorageKind::Memory).is_none());

        let bare = Host::builder().without_local_store().without_session_store().build();
        let w = bare.open_window("https://example.com/").unwrap();
        assert!(w.probe(StorageKind::Local).is_none());
        assert!(w.probe(StorageKind::Session).is_none());
    }

    #[test]
    fn opaque_origins_get_no_storage() {
        let host = Host::builder().build();
        let w = host.open_window("data:text/plain,hello").unwrap();
        assert!(w.probe(StorageKind::Local).is_none());
        assert!(w.probe(StorageKind::Session).is_none());
    }

    #[test]
    fn invalid_url_is_an_error() {
        let host = Host::builder().build();
        assert!(matches!(host.open_window("not a url"), Err(StorageError::InvalidUrl(_))));
    }

    #[test]
    fn closing_a_window_drops_its_session_storage() {
        let session = Arc::new(InMemorySessionStore::new());
        let host = Host::builder().session_store(session.clone()).build();
        let w = host.open_window("https://example.com/").unwrap();
        let id = w.id();
        let origin = w.origin().clone();
        w.probe(StorageKind::Session).unwrap().set_item("k", "v").unwrap();
        assert_eq!(host.window_count(), 1);

        drop(w);
        assert_eq!(host.window_count(), 0);
        assert!(session.area(id, &origin).get_item("k").is_none());
    }

    #[test]
    fn sessions_are_not_shared_between_windows() {
        let host = Host::builder().build();
        let a = host.open_window("https://example.com/").unwrap();
        let b = host.open_window("https://example.com/").unwrap();
        a.probe(StorageKind::Session).unwrap().set_item("k", "v").unwrap();
        assert!(b.probe(StorageKind::Session).unwrap().get_item("k").is_none());
    }
}
