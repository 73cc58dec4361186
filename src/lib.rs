pub mod config;
pub mod errors;
pub mod host;
pub mod plugin;
pub mod storage;

pub use config::{StorageKind, StorageOptions};
pub use errors::StorageError;
pub use plugin::StoragePlugin;
pub use storage::WebStorage;
