//! Facade that turns [`StorageOptions`] into a ready-to-use [`WebStorage`].
//!
//! A [`StoragePlugin`] owns the process-wide pieces every bridge shares: the
//! [`ChangeEventBus`], the [`MemoryStorage`] fallback and the clock. It probes
//! its [`Platform`] for native storage and falls back to memory when the
//! platform has none (or refuses access), so the only error callers see is an
//! unsupported `storage` option.
//!
//! ```rust
//! use webstorage::config::StorageOptions;
//! use webstorage::host::Host;
//! use webstorage::plugin::{GlobalProperties, StoragePlugin};
//!
//! # fn main() -> Result<(), webstorage::StorageError> {
//! let host = Host::builder().build();
//! let window = host.open_window("https://example.com/")?;
//! let plugin = StoragePlugin::new(window);
//!
//! let mut globals = GlobalProperties::default();
//! let opts = StorageOptions::builder().namespace("app:").build()?;
//! plugin.install(&mut globals, &opts)?;
//!
//! let ls = globals.get("$ls").unwrap();
//! ls.set("theme", "dark", None)?;
//! # Ok(()) }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::config::{BridgeOptionsPatch, ResolvedOptions, StorageKind, StorageOptions};
use crate::errors::StorageError;
use crate::host::Platform;
use crate::storage::{ChangeEventBus, Clock, MemoryStorage, StorageArea, SystemClock, WebStorage};

lazy_static! {
    static ref GLOBAL: StoragePlugin = StoragePlugin::headless();
}

/// Host framework surface a bridge can be attached to under a property name.
pub trait PropertySurface {
    fn define_property(&mut self, key: &str, storage: Arc<WebStorage>);
}

/// Map-backed [`PropertySurface`].
#[derive(Debug, Default)]
pub struct GlobalProperties {
    props: HashMap<String, Arc<WebStorage>>,
}

impl GlobalProperties {
    pub fn get(&self, key: &str) -> Option<&Arc<WebStorage>> {
        self.props.get(key)
    }
}

impl PropertySurface for GlobalProperties {
    fn define_property(&mut self, key: &str, storage: Arc<WebStorage>) {
        self.props.insert(key.to_string(), storage);
    }
}

pub struct StoragePlugin {
    platform: Option<Arc<dyn Platform>>,
    bus: Arc<ChangeEventBus>,
    memory: Arc<MemoryStorage>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StoragePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePlugin")
            .field("platform", &self.platform.is_some())
            .finish_non_exhaustive()
    }
}

impl StoragePlugin {
    /// Plugin running inside `platform`.
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform: Some(platform),
            ..Self::headless()
        }
    }

    /// Plugin without a platform: local and session storage always fall back to memory and no
    /// change events are received.
    pub fn headless() -> Self {
        Self {
            platform: None,
            bus: Arc::new(ChangeEventBus::new()),
            memory: Arc::new(MemoryStorage::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Process-wide headless plugin, created on first use.
    pub fn global() -> &'static StoragePlugin {
        &GLOBAL
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn bus(&self) -> &Arc<ChangeEventBus> {
        &self.bus
    }

    pub fn memory(&self) -> &Arc<MemoryStorage> {
        &self.memory
    }

    /// Resolves `options`, picks a backend and builds a bridge over it.
    pub fn use_storage(&self, options: &StorageOptions) -> Result<(Arc<WebStorage>, ResolvedOptions), StorageError> {
        let resolved = options.resolve()?;

        let backend: Arc<dyn StorageArea> = match resolved.storage {
            StorageKind::Memory => self.memory.clone(),
            kind => match self.platform.as_ref().and_then(|p| p.probe(kind)) {
                Some(area) => area,
                None => {
                    log::warn!("Storage \"{kind}\" is not supported by this host, using memory storage");
                    self.memory.clone()
                }
            },
        };

        let ls = Arc::new(WebStorage::new(backend, self.bus.clone(), self.platform.clone(), self.clock.clone()));
        ls.set_options(BridgeOptionsPatch::namespace(resolved.namespace.clone()));

        Ok((ls, resolved))
    }

    pub fn instance(&self, options: &StorageOptions) -> Result<Arc<WebStorage>, StorageError> {
        let (ls, _) = self.use_storage(options)?;
        Ok(ls)
    }

    /// Builds a bridge and registers it on `surface` as `$` + name (`$ls` by default).
    pub fn install(&self, surface: &mut dyn PropertySurface, options: &StorageOptions) -> Result<Arc<WebStorage>, StorageError> {
        let (ls, resolved) = self.use_storage(options)?;
        surface.define_property(&resolved.property_name(), ls.clone());
        log::debug!("installed {} storage as {}", resolved.storage, resolved.property_name());
        Ok(ls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{AccessPolicy, Host};

    fn opts(storage: &str) -> StorageOptions {
        StorageOptions { storage: Some(storage.into()), ..Default::default() }
    }

    #[test]
    fn unsupported_storage_is_the_only_error() {
        let plugin = StoragePlugin::headless();
        assert!(matches!(
            plugin.use_storage(&opts("bogus")),
            Err(StorageError::UnsupportedStorage(s)) if s == "bogus"
        ));
    }

    #[test]
    fn headless_local_falls_back_to_memory() {
        let plugin = StoragePlugin::headless();
        let (ls, resolved) = plugin.use_storage(&StorageOptions::default()).unwrap();
        assert_eq!(resolved.storage, StorageKind::Local);

        ls.set("k", &1, None).unwrap();
        assert!(plugin.memory().get_item("k").is_some());
    }

    #[test]
    fn denied_local_storage_falls_back_to_memory() {
        let host = Host::builder().policy(AccessPolicy::deny_all()).build();
        let window = host.open_window("https://example.com/").unwrap();
        let plugin = StoragePlugin::new(window);

        let ls = plugin.instance(&opts("session")).unwrap();
        ls.set("k", "v", None).unwrap();
        assert!(plugin.memory().get_item("k").is_some());
    }

    #[test]
    fn native_storage_is_used_when_available() {
        let host = Host::builder().build();
        let window = host.open_window("https://example.com/").unwrap();
        let plugin = StoragePlugin::new(window.clone());

        let ls = plugin.instance(&opts("local")).unwrap();
        ls.set("k", "v", None).unwrap();
        assert!(plugin.memory().is_empty());

        let other = host.open_window("https://example.com/other").unwrap();
        let area = other.probe(StorageKind::Local).unwrap();
        assert!(area.get_item("k").is_some());
    }

    #[test]
    fn memory_bridges_share_the_plugin_fallback() {
        let plugin = StoragePlugin::headless();
        let a = plugin.instance(&opts("memory")).unwrap();
        let b = plugin.instance(&opts("memory")).unwrap();
        a.set("k", &1, None).unwrap();
        assert_eq!(b.get::<i32>("k"), Some(1));
    }

    #[test]
    fn install_registers_under_dollar_name() {
        let plugin = StoragePlugin::headless();
        let mut globals = GlobalProperties::default();
        let options = StorageOptions::builder().storage(StorageKind::Memory).name("store").namespace("p:").build().unwrap();

        let ls = plugin.install(&mut globals, &options).unwrap();
        assert!(globals.get("$ls").is_none());
        let installed = globals.get("$store").unwrap();
        assert!(Arc::ptr_eq(installed, &ls));
        assert_eq!(installed.namespace(), "p:");
    }

    #[test]
    fn global_plugin_is_a_singleton() {
        assert!(std::ptr::eq(StoragePlugin::global(), StoragePlugin::global()));
        assert!(StoragePlugin::global().instance(&opts("memory")).is_ok());
    }
}
