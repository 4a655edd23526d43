//! Import backend lifecycle.

use std::sync::Arc;
use std::time::Duration;

use certqueue_config::ImportConfig;
use certqueue_core::{LeadershipGate, ReplicationSource, Storage};
use certqueue_scheduler::TaskScheduler;
use tracing::info;

use crate::controller::{CONTROLLER_TASK_NAME, QueueController, ReconcileReport};
use crate::error::ImportError;
use crate::filler::QueueFiller;
use crate::processor::ImportProcessor;
use crate::queue;
use crate::worker::{JobHandler, WorkerPool};

/// Wires the controller, fillers and workers onto a scheduler.
///
/// Nothing is persisted: after [`start`](Self::start) the first controller
/// tick rebuilds the filler tasks from the role list.
pub struct ImportBackend {
    storage: Arc<dyn Storage>,
    scheduler: Arc<TaskScheduler>,
    controller: Arc<QueueController>,
    controller_interval: Duration,
}

impl ImportBackend {
    /// Create a backend that imports with an [`ImportProcessor`].
    pub fn new(
        storage: Arc<dyn Storage>,
        replication: Arc<dyn ReplicationSource>,
        scheduler: Arc<TaskScheduler>,
        config: &ImportConfig,
    ) -> Self {
        let handler = Arc::new(ImportProcessor::from_config(config));
        Self::with_handler(storage, replication, scheduler, config, handler)
    }

    /// Create a backend that hands jobs to `handler`.
    pub fn with_handler(
        storage: Arc<dyn Storage>,
        replication: Arc<dyn ReplicationSource>,
        scheduler: Arc<TaskScheduler>,
        config: &ImportConfig,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        let filler = QueueFiller::new(
            Arc::clone(&storage),
            LeadershipGate::new(replication),
            WorkerPool::from_config(config),
            handler,
            scheduler.shutdown_token(),
        );
        let controller = QueueController::new(
            Arc::clone(&storage),
            Arc::clone(&scheduler),
            filler,
            config.filler_interval(),
        );

        Self {
            storage,
            scheduler,
            controller: Arc::new(controller),
            controller_interval: config.controller_interval(),
        }
    }

    /// Register the controller task.
    pub fn start(&self) -> Result<(), ImportError> {
        let controller = Arc::clone(&self.controller);
        self.scheduler.register(
            CONTROLLER_TASK_NAME,
            move || {
                let controller = Arc::clone(&controller);
                async move { controller.run_tick().await }
            },
            1,
            self.controller_interval,
        )?;
        info!(
            interval_ms = self.controller_interval.as_millis() as u64,
            "Import queue controller started"
        );
        Ok(())
    }

    /// Stop every task. Running batches finish; queued jobs are cancelled.
    pub fn stop(&self) {
        self.scheduler.stop();
        info!("Import queue controller stopped");
    }

    /// Run one reconciliation outside the schedule.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ImportError> {
        self.controller.reconcile().await
    }

    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// Every pending entry as `"<role>: <entry>"`.
    pub async fn list_all_entries(&self) -> Result<Vec<String>, ImportError> {
        queue::list_all_entries(self.storage.as_ref()).await
    }

    /// Pending entries of one role.
    pub async fn list_role_entries(&self, role: &str) -> Result<Vec<String>, ImportError> {
        queue::list_role_entries(self.storage.as_ref(), role).await
    }
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
