//! Storage system.
//!
//! This module defines the backend contract, the backends themselves, and the
//! [`WebStorage`] bridge applications talk to.
//!
//! # Concepts
//!
//! - **Storage areas**: raw string key/value stores implementing [`StorageArea`].
//!   Local areas come from a [`LocalStore`] (per origin), session areas from a
//!   [`SessionStore`] (per window and origin), and [`MemoryStorage`] is the
//!   fallback used when neither is available.
//! - **Envelopes**: every value a bridge writes is wrapped as
//!   `{"value": ..., "expire": <epoch millis> | null}`.
//! - **Namespaces**: a bridge prefixes each name with its namespace, so several
//!   bridges can share one area without seeing each other's keys.
//! - **Change events**: the [`ChangeEventBus`] turns raw [`StorageEvent`]s from
//!   the platform into listener calls with decoded values.
//!
//! # Choosing a backend
//!
//! - For persistent local storage, use [`SqliteLocalStore`] (feature `sqlite_local_store`).
//! - For tests or throwaway profiles, use [`InMemoryLocalStore`].
//! - Session storage is always [`InMemorySessionStore`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use webstorage::config::BridgeOptionsPatch;
//! use webstorage::storage::{ChangeEventBus, MemoryStorage, SystemClock, WebStorage};
//!
//! let ls = WebStorage::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(ChangeEventBus::new()),
//!     None,
//!     Arc::new(SystemClock),
//! );
//! ls.set_options(BridgeOptionsPatch::namespace("app:"));
//! ls.set("token", "abc", Some(3600)).unwrap();
//! assert_eq!(ls.get::<String>("token").as_deref(), Some("abc"));
//! ```

/// Storage area module, defining the key/value storage interface.
pub mod area;
/// The storage bridge.
pub mod bridge;
/// Listener registry for storage change events.
pub mod bus;
/// Value + expiry wrapper persisted for every entry.
pub mod envelope;
/// Raw storage change events.
pub mod event;
/// In-memory fallback store.
pub mod memory;
/// Clocks used for expiry deadlines.
pub mod types;

/// Local storage module, providing per-origin storage areas.
pub mod local {
    /// In-memory local storage implementation.
    pub mod in_memory;
    /// SQLite-backed local storage implementation.
    #[cfg(feature = "sqlite_local_store")]
    pub mod sqlite_store;
}

/// Session storage module, providing per-window storage areas.
pub mod session {
    /// In-memory session storage implementation.
    pub mod in_memory;
}

pub use area::{LocalStore, SessionStore, StorageArea};
pub use bridge::WebStorage;
pub use bus::{listener, ChangeEventBus, Listener};
pub use envelope::Envelope;
pub use event::StorageEvent;
pub use local::in_memory::InMemoryLocalStore;
#[cfg(feature = "sqlite_local_store")]
pub use local::sqlite_store::SqliteLocalStore;
pub use memory::MemoryStorage;
pub use session::in_memory::InMemorySessionStore;
pub use types::{Clock, ManualClock, SystemClock};
