#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage \"{0}\" is not supported")]
    UnsupportedStorage(String),

    #[error("Invalid storage options: {0}")]
    InvalidOptions(String),

    #[error("Invalid window URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
