//! Leadership gate.
//!
//! Import work must only happen on the single read/write primary. The host
//! reports replication state as a set of flags; this module turns a snapshot
//! of those flags into a yes/no decision. The decision is recomputed on every
//! call because replication state can change while the process runs.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};

/// Replication and standby flags of this node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationStatus {
    /// The mount is local to this cluster (not replicated).
    #[serde(default)]
    pub local_mount: bool,

    /// Node is a performance-replication secondary.
    #[serde(default)]
    pub performance_secondary: bool,

    /// Node is a disaster-recovery secondary.
    #[serde(default)]
    pub dr_secondary: bool,

    /// Node is a performance standby.
    #[serde(default)]
    pub performance_standby: bool,
}

impl ReplicationStatus {
    /// Status of a plain primary.
    pub fn primary() -> Self {
        Self::default()
    }

    /// Whether a node in this state may perform import work.
    ///
    /// `local_mount` does not grant eligibility on a secondary.
    pub fn is_eligible_to_run(&self) -> bool {
        !(self.dr_secondary || self.performance_secondary || self.performance_standby)
    }
}

/// Source of the current replication status.
#[async_trait]
pub trait ReplicationSource: Send + Sync {
    async fn replication_status(&self) -> CoreResult<ReplicationStatus>;
}

/// Status held in memory, changeable at runtime.
#[derive(Debug, Default)]
pub struct StaticReplicationSource {
    status: RwLock<ReplicationStatus>,
}

impl StaticReplicationSource {
    pub fn new(status: ReplicationStatus) -> Self {
        Self {
            status: RwLock::new(status),
        }
    }

    /// A source that always reports a primary.
    pub fn primary() -> Self {
        Self::new(ReplicationStatus::primary())
    }

    /// Replace the reported status.
    pub fn set(&self, status: ReplicationStatus) {
        *self.status.write() = status;
    }
}

#[async_trait]
impl ReplicationSource for StaticReplicationSource {
    async fn replication_status(&self) -> CoreResult<ReplicationStatus> {
        Ok(*self.status.read())
    }
}

/// Status read from a JSON file on every query.
///
/// A missing or malformed file is an error, which the gate treats as
/// "not eligible".
#[derive(Debug, Clone)]
pub struct FileReplicationSource {
    path: PathBuf,
}

impl FileReplicationSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReplicationSource for FileReplicationSource {
    async fn replication_status(&self) -> CoreResult<ReplicationStatus> {
        let content = tokio::fs::read(&self.path).await.map_err(|e| {
            CoreError::ReplicationUnavailable(format!("{}: {}", self.path.display(), e))
        })?;
        serde_json::from_slice(&content).map_err(|e| {
            CoreError::ReplicationUnavailable(format!("{}: {}", self.path.display(), e))
        })
    }
}

/// Answers "may this node import right now?".
#[derive(Clone)]
pub struct LeadershipGate {
    source: Arc<dyn ReplicationSource>,
}

impl LeadershipGate {
    pub fn new(source: Arc<dyn ReplicationSource>) -> Self {
        Self { source }
    }

    /// Evaluate the current status. Fails closed when it cannot be read.
    pub async fn is_eligible(&self) -> bool {
        match self.source.replication_status().await {
            Ok(status) => {
                let eligible = status.is_eligible_to_run();
                debug!(?status, eligible, "Evaluated replication status");
                eligible
            }
            Err(e) => {
                warn!("Cannot determine replication status, skipping import work: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "leadership_tests.rs"]
mod tests;
