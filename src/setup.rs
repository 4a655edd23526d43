//! Construction of storage and replication sources from configuration.

use std::sync::Arc;

use certqueue_config::{ConfigLoader, ReplicationConfig, StorageBackend, StorageConfig};
use certqueue_core::{
    FileReplicationSource, FileStorage, MemoryStorage, ReplicationSource, ReplicationStatus,
    StaticReplicationSource, Storage,
};
use tracing::info;

/// Open the configured storage backend.
pub(crate) async fn open_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn Storage>, Box<dyn std::error::Error>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Ok(Arc::new(MemoryStorage::new()))
        }
        StorageBackend::File => {
            let root = ConfigLoader::expand_path(&config.path);
            info!(path = %root.display(), "Using file storage");
            Ok(Arc::new(FileStorage::new(root).await?))
        }
    }
}

/// Build the replication status source.
pub(crate) fn replication_source(config: &ReplicationConfig) -> Arc<dyn ReplicationSource> {
    match &config.status_file {
        Some(path) => {
            let path = ConfigLoader::expand_path(path);
            info!(path = %path.display(), "Reading replication status from file");
            Arc::new(FileReplicationSource::new(path))
        }
        None => Arc::new(StaticReplicationSource::new(static_status(config))),
    }
}

fn static_status(config: &ReplicationConfig) -> ReplicationStatus {
    ReplicationStatus {
        local_mount: config.local_mount,
        performance_secondary: config.performance_secondary,
        dr_secondary: config.dr_secondary,
        performance_standby: config.performance_standby,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_status_from_config() {
        let config = ReplicationConfig {
            dr_secondary: true,
            ..Default::default()
        };
        let status = static_status(&config);
        assert!(status.dr_secondary);
        assert!(!status.is_eligible_to_run());
        assert!(static_status(&ReplicationConfig::default()).is_eligible_to_run());
    }

    #[tokio::test]
    async fn test_status_file_source_fails_closed() {
        let config = ReplicationConfig {
            status_file: Some("/nonexistent/certqueue/status.json".to_string()),
            ..Default::default()
        };
        assert!(replication_source(&config).replication_status().await.is_err());
    }

    #[tokio::test]
    async fn test_open_file_storage() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::File,
            path: dir.path().join("data").to_string_lossy().into_owned(),
        };
        let storage = open_storage(&config).await.unwrap();
        assert!(storage.list("").await.unwrap().is_empty());
        assert!(dir.path().join("data").is_dir());
    }
}
