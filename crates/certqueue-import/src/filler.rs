//! Per-role queue filler.

use std::sync::Arc;

use certqueue_core::{LeadershipGate, Storage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::ImportError;
use crate::job::{BatchReport, Job};
use crate::queue::{list_role_entries, queue_path};
use crate::worker::{JobHandler, WorkerPool};

/// What a filler tick did.
#[derive(Debug, Clone)]
pub enum FillOutcome {
    /// This node may not import; storage was not touched.
    Standby,
    /// The role's queue was listed and every entry dispatched.
    Drained(BatchReport),
}

/// Drains one role's queue through the worker pool.
///
/// Cloned into every `fillqueue-<role>` task; all clones share the storage,
/// gate and handler.
#[derive(Clone)]
pub struct QueueFiller {
    storage: Arc<dyn Storage>,
    gate: LeadershipGate,
    pool: WorkerPool,
    handler: Arc<dyn JobHandler>,
    ctx: CancellationToken,
}

impl QueueFiller {
    pub fn new(
        storage: Arc<dyn Storage>,
        gate: LeadershipGate,
        pool: WorkerPool,
        handler: Arc<dyn JobHandler>,
        ctx: CancellationToken,
    ) -> Self {
        Self {
            storage,
            gate,
            pool,
            handler,
            ctx,
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Dispatch every pending entry of `role` and wait for the batch.
    ///
    /// Leadership is checked first; an ineligible node returns
    /// [`FillOutcome::Standby`] without reading storage.
    pub async fn fill(&self, role: &str) -> Result<FillOutcome, ImportError> {
        if !self.gate.is_eligible().await {
            debug!(role = %role, "Not the active node, skipping import queue");
            return Ok(FillOutcome::Standby);
        }

        let import_path = queue_path(role);
        let entries = list_role_entries(self.storage.as_ref(), role).await?;
        debug!(role = %role, pending = entries.len(), "Import queue listed");
        if entries.is_empty() {
            return Ok(FillOutcome::Drained(BatchReport::default()));
        }

        let jobs = entries.into_iter().enumerate().map(|(id, entry)| Job {
            id: id as u64,
            role_name: role.to_string(),
            entry,
            import_path: import_path.clone(),
            storage: Arc::clone(&self.storage),
            ctx: self.ctx.clone(),
        });
        let report = self.pool.run_batch(jobs, Arc::clone(&self.handler)).await;

        info!(
            role = %role,
            total = report.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            panicked = report.panicked(),
            cancelled = report.cancelled(),
            "Import queue batch finished"
        );
        Ok(FillOutcome::Drained(report))
    }

    /// Scheduled entry point: [`fill`](Self::fill) with errors logged.
    pub async fn run_tick(&self, role: &str) {
        if let Err(e) = self.fill(role).await {
            error!(role = %role, "Import queue tick failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "filler_tests.rs"]
mod tests;
