use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::area::StorageArea;
use super::bus::{ChangeEventBus, Listener};
use super::envelope::Envelope;
use super::types::Clock;
use crate::config::{BridgeOptions, BridgeOptionsPatch};
use crate::errors::StorageError;
use crate::host::{Platform, StorageEventListener};

/// Storage bridge: namespaced, expiring JSON values on top of a raw [`StorageArea`].
///
/// Every logical name is prefixed with the bridge's namespace before it reaches the backend, and
/// every value is stored as an [`Envelope`] carrying an optional absolute deadline. Reads never
/// fail: missing, corrupt and expired entries all come back as a miss.
pub struct WebStorage {
    storage: Arc<dyn StorageArea>,
    options: RwLock<BridgeOptions>,
    bus: Arc<ChangeEventBus>,
    clock: Arc<dyn Clock>,
    /// Owner of the event subscription; held so the context stays open as long as the bridge.
    platform: Option<Arc<dyn Platform>>,
}

impl Debug for WebStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebStorage")
            .field("options", &self.options())
            .field("platform", &self.platform.is_some())
            .finish_non_exhaustive()
    }
}

impl WebStorage {
    /// Wraps `storage`. When a platform is given, `bus` is attached to its event target for every
    /// configured event so changes made by other contexts reach this bridge's listeners. The
    /// bridge keeps the platform alive for its own lifetime.
    pub fn new(
        storage: Arc<dyn StorageArea>,
        bus: Arc<ChangeEventBus>,
        platform: Option<Arc<dyn Platform>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let options = BridgeOptions::default();
        if let Some(platform) = &platform {
            let target = platform.event_target();
            for event in &options.events {
                target.add_event_listener(event, bus.clone() as Arc<dyn StorageEventListener>);
            }
        }

        Self {
            storage,
            options: RwLock::new(options),
            bus,
            clock,
            platform,
        }
    }

    /// Merges `patch` into the current options; fields left `None` are kept.
    pub fn set_options(&self, patch: BridgeOptionsPatch) {
        let mut guard = self.options.write().unwrap_or_else(PoisonError::into_inner);
        patch.apply(&mut guard);
    }

    pub fn options(&self) -> BridgeOptions {
        self.options.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn namespace(&self) -> String {
        self.options.read().unwrap_or_else(PoisonError::into_inner).namespace.clone()
    }

    /// Platform whose event target this bridge listens on, if any.
    pub fn platform(&self) -> Option<&Arc<dyn Platform>> {
        self.platform.as_ref()
    }

    fn full_key(&self, name: &str) -> String {
        format!("{}{}", self.namespace(), name)
    }

    /// Stores `value` under `name`. With `expire_secs` the entry disappears that many seconds
    /// from now; a negative lifetime stores an already expired entry.
    pub fn set<V: Serialize + ?Sized>(&self, name: &str, value: &V, expire_secs: Option<i64>) -> Result<(), StorageError> {
        let envelope = Envelope::new(serde_json::to_value(value)?, expire_secs, self.clock.now_millis());
        let key = self.full_key(name);
        log::debug!("set {key:?} (expire: {:?})", envelope.expire);
        self.storage.set_item(&key, &envelope.encode()?)?;
        Ok(())
    }

    /// Returns the stored JSON value, or `None` when absent, corrupt or expired. An expired entry
    /// is removed from the backend.
    pub fn get_value(&self, name: &str) -> Option<Value> {
        let key = self.full_key(name);
        let raw = self.storage.get_item(&key)?;

        let envelope = match Envelope::decode(&raw) {
            Ok(env) => env,
            Err(e) => {
                log::debug!("ignoring unreadable entry {key:?}: {e}");
                return None;
            }
        };

        if envelope.is_expired(self.clock.now_millis()) {
            log::debug!("entry {key:?} expired, removing");
            if let Err(e) = self.storage.remove_item(&key) {
                log::warn!("cannot remove expired entry {key:?}: {e}");
            }
            return None;
        }

        Some(envelope.value)
    }

    /// Like [`get_value`](Self::get_value), deserialized into `T`. A value of another shape is
    /// a miss.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let value = self.get_value(name)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::debug!("entry {name:?} does not have the requested shape: {e}");
                None
            }
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.get(name).unwrap_or(default)
    }

    /// Raw backend key at `index`; not filtered by namespace and not stripped of it.
    pub fn key(&self, index: usize) -> Option<String> {
        self.storage.key(index)
    }

    /// Number of entries in the backend, across all namespaces.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Removes `name`; returns whether it was present.
    pub fn remove(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.storage.remove_item(&self.full_key(name))?)
    }

    /// Removes every key of this bridge's namespace, leaving other namespaces untouched.
    ///
    /// Keys are collected first and removed afterwards, so the scan assumes the backend's key
    /// order does not change in between. A concurrent writer in another context can make it miss
    /// keys.
    pub fn clear(&self) -> Result<(), StorageError> {
        if self.storage.is_empty() {
            return Ok(());
        }

        let namespace = self.namespace();
        let doomed: Vec<String> = (0..self.storage.len())
            .filter_map(|i| self.storage.key(i))
            .filter(|key| in_namespace(key, &namespace))
            .collect();

        log::debug!("clearing {} key(s) of namespace {namespace:?}", doomed.len());
        for key in &doomed {
            self.storage.remove_item(key)?;
        }
        Ok(())
    }

    /// Calls `callback` with `(new, old, url)` whenever `name` is changed by another context.
    pub fn on(&self, name: &str, callback: Listener) {
        self.bus.on(&self.full_key(name), callback);
    }

    pub fn off(&self, name: &str, callback: &Listener) {
        self.bus.off(&self.full_key(name), callback);
    }
}

/// Case-insensitive namespace match; the key must extend past the prefix.
fn in_namespace(key: &str, namespace: &str) -> bool {
    let (key, namespace) = (key.to_lowercase(), namespace.to_lowercase());
    key.strip_prefix(namespace.as_str()).is_some_and(|rest| !rest.is_empty())
}
