//! Reconciliation of per-role filler tasks.

use std::sync::Arc;
use std::time::Duration;

use certqueue_core::{ROLE_PREFIX, Storage, get_role, list_roles};
use certqueue_scheduler::{Registration, TaskScheduler};
use tracing::{debug, error, info, warn};

use crate::error::ImportError;
use crate::filler::QueueFiller;

/// Scheduler name of the controller task.
pub const CONTROLLER_TASK_NAME: &str = "importcontroller";

/// Scheduler name prefix of per-role filler tasks.
pub const FILLER_TASK_PREFIX: &str = "fillqueue-";

/// Scheduler name of a role's filler task.
pub fn filler_task_name(role: &str) -> String {
    format!("{}{}", FILLER_TASK_PREFIX, role)
}

/// Roles touched by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Roles whose filler was started or restarted.
    pub started: Vec<String>,
    /// Roles whose existing filler was refreshed in place.
    pub refreshed: Vec<String>,
    /// Roles that could not be read this time.
    pub skipped: Vec<String>,
    /// Roles whose filler was removed.
    pub removed: Vec<String>,
}

/// Keeps one `fillqueue-<role>` task per configured role.
pub struct QueueController {
    storage: Arc<dyn Storage>,
    scheduler: Arc<TaskScheduler>,
    filler: QueueFiller,
    filler_interval: Duration,
}

impl QueueController {
    pub fn new(
        storage: Arc<dyn Storage>,
        scheduler: Arc<TaskScheduler>,
        filler: QueueFiller,
        filler_interval: Duration,
    ) -> Self {
        Self {
            storage,
            scheduler,
            filler,
            filler_interval,
        }
    }

    /// Bring the filler task set in line with the role list.
    ///
    /// A failure to list roles leaves every task as it was. A role that
    /// cannot be read is skipped and keeps its filler if it had one.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ImportError> {
        let roles = list_roles(self.storage.as_ref())
            .await
            .map_err(|source| ImportError::List {
                path: ROLE_PREFIX.to_string(),
                source,
            })?;

        let mut report = ReconcileReport::default();

        for role in &roles {
            match get_role(self.storage.as_ref(), role).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    warn!(role = %role, "Role vanished while reconciling, skipping");
                    report.skipped.push(role.clone());
                    continue;
                }
                Err(e) => {
                    warn!(role = %role, "Cannot read role, skipping: {}", e);
                    report.skipped.push(role.clone());
                    continue;
                }
            }

            let filler = self.filler.clone();
            let name = role.clone();
            let registration = self.scheduler.register(
                filler_task_name(role),
                move || {
                    let filler = filler.clone();
                    let role = name.clone();
                    async move { filler.run_tick(&role).await }
                },
                1,
                self.filler_interval,
            )?;

            match registration {
                Registration::Updated => report.refreshed.push(role.clone()),
                Registration::Started | Registration::Restarted => {
                    info!(role = %role, "Import queue filler scheduled");
                    report.started.push(role.clone());
                }
            }
        }

        for task in self.scheduler.task_names() {
            let Some(role) = task.strip_prefix(FILLER_TASK_PREFIX) else {
                continue;
            };
            if !roles.iter().any(|r| r == role) && self.scheduler.del(&task) {
                info!(role = %role, "Import queue filler removed");
                report.removed.push(role.to_string());
            }
        }

        Ok(report)
    }

    /// Scheduled entry point: [`reconcile`](Self::reconcile) with errors logged.
    pub async fn run_tick(&self) {
        match self.reconcile().await {
            Ok(report) => debug!(
                started = report.started.len(),
                refreshed = report.refreshed.len(),
                skipped = report.skipped.len(),
                removed = report.removed.len(),
                "Import queue reconciliation finished"
            ),
            Err(e) => error!("Import queue reconciliation failed: {}", e),
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
