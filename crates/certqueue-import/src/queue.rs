//! Import queue layout and read/write helpers.
//!
//! Pending certificates live at `import-queue/<role>/<entry>`, one DER
//! encoded certificate per entry.

use certqueue_core::{Storage, StorageEntry};
use tracing::{debug, warn};

use crate::error::ImportError;

/// Storage prefix of every role's queue.
pub const IMPORT_QUEUE_PREFIX: &str = "import-queue/";

/// Queue folder of a role, ending in `/`.
pub fn queue_path(role: &str) -> String {
    format!("{}{}/", IMPORT_QUEUE_PREFIX, role)
}

/// Every pending entry across all roles, as `"<role>: <entry>"`.
pub async fn list_all_entries(storage: &dyn Storage) -> Result<Vec<String>, ImportError> {
    let roles = list_prefix(storage, IMPORT_QUEUE_PREFIX).await?;

    let mut entries = Vec::new();
    for folder in roles.iter().filter(|name| name.ends_with('/')) {
        let role = folder.trim_end_matches('/');
        for entry in list_role_entries(storage, role).await? {
            entries.push(format!("{}: {}", role, entry));
        }
    }
    Ok(entries)
}

/// Pending entry names of one role.
pub async fn list_role_entries(storage: &dyn Storage, role: &str) -> Result<Vec<String>, ImportError> {
    let names = list_prefix(storage, &queue_path(role)).await?;
    Ok(names.into_iter().filter(|name| !name.ends_with('/')).collect())
}

/// Queue a DER certificate for `role` under `serial`. Returns the entry key.
///
/// An existing entry with the same serial is replaced.
pub async fn enqueue_certificate(
    storage: &dyn Storage,
    role: &str,
    serial: &str,
    der: impl Into<Vec<u8>>,
) -> Result<String, ImportError> {
    let key = format!("{}{}", queue_path(role), serial);
    storage.put(StorageEntry::new(key.clone(), der)).await?;
    debug!(role = %role, entry = %serial, "Certificate queued for import");
    Ok(key)
}

/// Remove every pending entry of `role`. Returns how many were removed.
///
/// A failed delete is logged and the remaining entries are still tried.
pub async fn purge_role_queue(storage: &dyn Storage, role: &str) -> Result<usize, ImportError> {
    let path = queue_path(role);
    let mut removed = 0;
    for entry in list_role_entries(storage, role).await? {
        match storage.delete(&format!("{}{}", path, entry)).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(role = %role, entry = %entry, "Failed to remove queued certificate: {}", e),
        }
    }
    Ok(removed)
}

async fn list_prefix(storage: &dyn Storage, path: &str) -> Result<Vec<String>, ImportError> {
    storage.list(path).await.map_err(|source| ImportError::List {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
