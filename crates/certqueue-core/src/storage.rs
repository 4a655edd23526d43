//! Key/value storage consumed by the import subsystem.
//!
//! Keys are `/`-separated paths. Listing returns the direct children of a
//! folder, with sub-folders suffixed by `/`:
//!
//! ```text
//! import-queue/
//! ├── web/
//! │   ├── 01
//! │   └── 02
//! └── mail/
//!     └── 0a
//! ```
//!
//! `list("import-queue/")` yields `["mail/", "web/"]` and
//! `list("import-queue/web/")` yields `["01", "02"]`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl StorageEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Storage backend.
///
/// Implementations must tolerate concurrent calls from several tasks.
#[async_trait]
pub trait Storage: Send + Sync {
    /// List the direct children of `prefix`, sorted. Sub-folders end in `/`.
    /// A prefix with no children yields an empty list.
    async fn list(&self, prefix: &str) -> CoreResult<Vec<String>>;

    /// Get the entry at `key`, or `None` when absent.
    async fn get(&self, key: &str) -> CoreResult<Option<StorageEntry>>;

    /// Create or overwrite an entry.
    async fn put(&self, entry: StorageEntry) -> CoreResult<()>;

    /// Delete an entry. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> CoreResult<()>;
}

/// Normalize a list prefix to folder form (`""` or ending in `/`).
fn folder_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}

fn validate_key(key: &str) -> CoreResult<()> {
    if key.is_empty() || key.starts_with('/') || key.ends_with('/') {
        return Err(CoreError::InvalidKey(key.to_string()));
    }
    let bad_segment = key
        .split('/')
        .any(|s| s.is_empty() || s == "." || s == ".." || s.contains('\\'));
    if bad_segment {
        return Err(CoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn validate_prefix(prefix: &str) -> CoreResult<()> {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(());
    }
    validate_key(trimmed)
}

/// In-memory storage.
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list(&self, prefix: &str) -> CoreResult<Vec<String>> {
        validate_prefix(prefix)?;
        let prefix = folder_prefix(prefix);
        let entries = self.entries.read().await;

        let mut children = BTreeSet::new();
        for key in entries
            .range(prefix.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(&prefix))
        {
            let rest = &key[prefix.len()..];
            let child = match rest.find('/') {
                Some(idx) => &rest[..=idx],
                None => rest,
            };
            children.insert(child.to_string());
        }
        Ok(children.into_iter().collect())
    }

    async fn get(&self, key: &str) -> CoreResult<Option<StorageEntry>> {
        validate_key(key)?;
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .map(|value| StorageEntry::new(key, value.clone())))
    }

    async fn put(&self, entry: StorageEntry) -> CoreResult<()> {
        validate_key(&entry.key)?;
        self.entries.write().await.insert(entry.key, entry.value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Directory-backed storage: one file per key, folders as directories.
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn new(root: impl Into<PathBuf>) -> CoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!("FileStorage initialized at {:?}", root);
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> CoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn list(&self, prefix: &str) -> CoreResult<Vec<String>> {
        validate_prefix(prefix)?;
        let trimmed = prefix.trim_end_matches('/');
        let dir = if trimmed.is_empty() {
            self.root.clone()
        } else {
            self.root.join(trimmed)
        };

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut children = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                children.push(format!("{}/", name));
            } else {
                children.push(name);
            }
        }
        children.sort();
        Ok(children)
    }

    async fn get(&self, key: &str) -> CoreResult<Option<StorageEntry>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(value) => Ok(Some(StorageEntry::new(key, value))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, entry: StorageEntry) -> CoreResult<()> {
        let path = self.path_for(&entry.key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &entry.value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
