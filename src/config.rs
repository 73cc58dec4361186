//! Storage configuration.
//!
//! [`StorageOptions`] is what a caller hands to the
//! [`StoragePlugin`](crate::plugin::StoragePlugin). Every field is optional;
//! [`StorageOptions::resolve`] fills in the defaults and validates the backend
//! name, producing [`ResolvedOptions`].
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use webstorage::config::{StorageKind, StorageOptions};
//! let resolved = StorageOptions::default().resolve().unwrap();
//! assert_eq!(resolved.storage, StorageKind::Local);
//! assert_eq!(resolved.name, "ls");
//! assert_eq!(resolved.namespace, "");
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use webstorage::config::{StorageKind, StorageOptions};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opts = StorageOptions::builder()
//!     .storage(StorageKind::Session)
//!     .name("store")
//!     .namespace("app:")
//!     .build()?; // returns Result<StorageOptions, StorageError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `storage`: `"local"`, `"session"` or `"memory"` (default: `"local"`).
//! - `name`: property name the bridge is installed under, prefixed with `$` (default: `"ls"`).
//! - `namespace`: prefix prepended to every key (default: `""`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

pub const DEFAULT_STORAGE: StorageKind = StorageKind::Local;
pub const DEFAULT_NAME: &str = "ls";
/// Name of the platform event the bridge listens to unless configured otherwise.
pub const STORAGE_EVENT: &str = "storage";

/// Which backend a bridge should sit on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Durable storage shared by all windows of an origin.
    Local,
    /// Storage scoped to a single window.
    Session,
    /// The in-memory fallback store.
    Memory,
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(StorageKind::Local),
            "session" => Ok(StorageKind::Session),
            "memory" => Ok(StorageKind::Memory),
            other => Err(StorageError::UnsupportedStorage(other.to_string())),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageKind::Local => "local",
            StorageKind::Session => "session",
            StorageKind::Memory => "memory",
        };
        f.write_str(s)
    }
}

/// User supplied options. Unset (or empty) fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    pub storage: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
}

impl StorageOptions {
    pub fn builder() -> StorageOptionsBuilder {
        StorageOptionsBuilder::default()
    }

    /// Parses options from a JSON object such as `{"storage": "session", "namespace": "app:"}`.
    pub fn from_json(json: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Applies defaults and validates the backend name.
    pub fn resolve(&self) -> Result<ResolvedOptions, StorageError> {
        let storage = match non_empty(&self.storage) {
            Some(s) => s.parse()?,
            None => DEFAULT_STORAGE,
        };

        Ok(ResolvedOptions {
            storage,
            name: non_empty(&self.name).unwrap_or(DEFAULT_NAME).to_string(),
            namespace: self.namespace.clone().unwrap_or_default(),
        })
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Builder for [`StorageOptions`].
#[derive(Debug, Clone, Default)]
pub struct StorageOptionsBuilder {
    inner: StorageOptions,
}

impl StorageOptionsBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut StorageOptions)) -> Self {
        f(&mut self.inner);
        self
    }

    /// Accepts a [`StorageKind`] or any backend name; unknown names are rejected by [`build`](Self::build).
    pub fn storage<S: fmt::Display>(self, storage: S) -> Self { self.map(|o| o.storage = Some(storage.to_string())) }
    pub fn name<S: Into<String>>(self, name: S) -> Self { self.map(|o| o.name = Some(name.into())) }
    pub fn namespace<S: Into<String>>(self, ns: S) -> Self { self.map(|o| o.namespace = Some(ns.into())) }

    /// Validate and build the final options.
    pub fn build(self) -> Result<StorageOptions, StorageError> {
        self.inner.resolve()?;
        Ok(self.inner)
    }
}

/// Options after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub storage: StorageKind,
    pub name: String,
    pub namespace: String,
}

impl ResolvedOptions {
    /// Key under which the bridge is registered on a property surface.
    pub fn property_name(&self) -> String {
        format!("${}", self.name)
    }
}

/// Options held by a [`WebStorage`](crate::storage::WebStorage) bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    pub namespace: String,
    /// Platform events the change bus is attached to at construction.
    pub events: Vec<String>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            events: vec![STORAGE_EVENT.to_string()],
        }
    }
}

/// Partial update for [`BridgeOptions`]; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct BridgeOptionsPatch {
    pub namespace: Option<String>,
    pub events: Option<Vec<String>>,
}

impl BridgeOptionsPatch {
    pub fn namespace<S: Into<String>>(ns: S) -> Self {
        Self { namespace: Some(ns.into()), events: None }
    }

    pub(crate) fn apply(self, opts: &mut BridgeOptions) {
        if let Some(ns) = self.namespace {
            opts.namespace = ns;
        }
        if let Some(events) = self.events {
            opts.events = events;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let r = StorageOptions::default().resolve().unwrap();
        assert_eq!(r.storage, StorageKind::Local);
        assert_eq!(r.name, "ls");
        assert_eq!(r.namespace, "");
        assert_eq!(r.property_name(), "$ls");
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let opts = StorageOptions {
            storage: Some(String::new()),
            name: Some(String::new()),
            namespace: Some(String::new()),
        };
        let r = opts.resolve().unwrap();
        assert_eq!(r.storage, StorageKind::Local);
        assert_eq!(r.name, "ls");
    }

    #[test]
    fn unknown_storage_is_rejected_with_its_name() {
        let opts = StorageOptions { storage: Some("bogus".into()), ..Default::default() };
        match opts.resolve() {
            Err(StorageError::UnsupportedStorage(s)) => assert_eq!(s, "bogus"),
            other => panic!("expected UnsupportedStorage, got {other:?}"),
        }
    }

    #[test]
    fn builder_validates() {
        let opts = StorageOptions::builder()
            .storage(StorageKind::Memory)
            .name("store")
            .namespace("app:")
            .build()
            .unwrap();
        let r = opts.resolve().unwrap();
        assert_eq!(r.storage, StorageKind::Memory);
        assert_eq!(r.property_name(), "$store");
        assert_eq!(r.namespace, "app:");

        assert!(StorageOptions::builder().storage("cookies").build().is_err());
    }

    #[test]
    fn parses_from_json() {
        let opts = StorageOptions::from_json(r#"{"storage":"session","namespace":"x."}"#).unwrap();
        assert_eq!(opts.storage.as_deref(), Some("session"));
        assert_eq!(opts.name, None);
        assert_eq!(opts.resolve().unwrap().storage, StorageKind::Session);

        assert!(StorageOptions::from_json("not json").is_err());
    }

    #[test]
    fn kind_display_round_trips_through_from_str() {
        for kind in [StorageKind::Local, StorageKind::Session, StorageKind::Memory] {
            assert_eq!(kind.to_string().parse::<StorageKind>().unwrap(), kind);
        }
    }

    #[test]
    fn patch_only_overwrites_given_fields() {
        let mut opts = BridgeOptions::default();
        BridgeOptionsPatch::namespace("a:").apply(&mut opts);
        assert_eq!(opts.namespace, "a:");
        assert_eq!(opts.events, vec!["storage".to_string()]);

        BridgeOptionsPatch { namespace: None, events: Some(vec![]) }.apply(&mut opts);
        assert_eq!(opts.namespace, "a:");
        assert!(opts.events.is_empty());
    }
}
