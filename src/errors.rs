/// Errors surfaced by the storage and cookie accessors.
///
/// Conditions where data is simply not usable (missing key, expired entry,
/// version mismatch, no store attached) are not errors: they are reported as
/// `Ok(None)` by the accessors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
