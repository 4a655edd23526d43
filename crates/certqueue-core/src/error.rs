//! Core errors.

use thiserror::Error;

/// Errors raised by storage, role and replication-status access.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key cannot be mapped onto the store.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend-specific failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Stored role could not be decoded.
    #[error("Failed to decode role '{name}': {source}")]
    RoleDecode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Replication status could not be obtained.
    #[error("Replication status unavailable: {0}")]
    ReplicationUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
