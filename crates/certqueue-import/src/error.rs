//! Import errors.

use certqueue_core::CoreError;
use certqueue_scheduler::SchedulerError;
use thiserror::Error;

/// Import error types.
///
/// Every variant except [`ImportError::Scheduler`] describes a single job or
/// tick that failed; the queue entry involved stays in storage and is
/// retried on the next tick.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Reading a queue entry from storage failed.
    #[error("Failed to fetch queue entry {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: CoreError,
    },

    /// The queue entry was gone by the time a worker looked for it.
    #[error("Queue entry not found: {key}")]
    EntryNotFound { key: String },

    /// The entry does not hold a DER encoded X.509 certificate.
    #[error("Failed to parse certificate at {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Reading the role definition failed.
    #[error("Failed to load role {role}: {source}")]
    Role {
        role: String,
        #[source]
        source: CoreError,
    },

    /// The role was deleted while its queue still had entries.
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// The certificate file for the external command could not be written.
    #[error("Failed to write certificate file: {0}")]
    TempFile(#[source] std::io::Error),

    /// The external command could not be started, failed or timed out.
    #[error("External command failed for '{cn}' (serial {serial}): {reason}")]
    Command {
        cn: String,
        serial: String,
        reason: String,
    },

    /// Listing a storage prefix failed.
    #[error("Failed to list {path}: {source}")]
    List {
        path: String,
        #[source]
        source: CoreError,
    },

    /// Writing to or deleting from storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] CoreError),

    /// Registering a periodic task failed.
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}
