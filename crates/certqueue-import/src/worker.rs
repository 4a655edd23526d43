//! Worker pool for import jobs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use certqueue_config::ImportConfig;
use certqueue_scheduler::panic_message;
use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::ImportError;
use crate::job::{BatchReport, Job, JobOutcome, JobReport};

/// Job handler trait.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Process one job, returning a human readable result line.
    async fn handle(&self, job: &Job) -> Result<String, ImportError>;
}

/// Fixed-size pool draining one batch of jobs through a bounded channel.
///
/// A new channel and a new set of workers are created for every batch; the
/// pool itself only carries the sizing.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
    capacity: usize,
}

impl WorkerPool {
    /// Create a pool. Both values are raised to at least 1.
    pub fn new(workers: usize, capacity: usize) -> Self {
        Self {
            workers: workers.max(1),
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.workers, config.channel_capacity)
    }

    /// Number of workers per batch.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Capacity of the job channel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Feed `jobs` to the workers and wait until every one has been handled.
    ///
    /// A panicking job is reported as [`JobOutcome::Panicked`] and its worker
    /// moves on to the next job. The returned report is ordered by job id.
    pub async fn run_batch<I>(&self, jobs: I, handler: Arc<dyn JobHandler>) -> BatchReport
    where
        I: IntoIterator<Item = Job>,
    {
        let (tx, rx) = mpsc::channel::<Job>(self.capacity);
        let rx = Arc::new(Mutex::new(rx));

        let mut set = JoinSet::new();
        for worker in 0..self.workers {
            let rx = Arc::clone(&rx);
            let handler = Arc::clone(&handler);
            set.spawn(async move {
                let mut reports = Vec::new();
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(job) = next else {
                        break;
                    };
                    reports.push(run_job(worker, job, handler.as_ref()).await);
                }
                debug!(worker, jobs = reports.len(), "Worker finished");
                reports
            });
        }

        for job in jobs {
            if tx.send(job).await.is_err() {
                error!("All workers exited before the batch was dispatched");
                break;
            }
        }
        drop(tx);

        let mut report = BatchReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(reports) => report.jobs.extend(reports),
                Err(e) => error!("Worker task failed: {}", e),
            }
        }
        report.jobs.sort_by_key(|j| j.id);
        report
    }
}

async fn run_job(worker: usize, job: Job, handler: &dyn JobHandler) -> JobReport {
    let started = Instant::now();

    let outcome = if job.ctx.is_cancelled() {
        debug!(role = %job.role_name, job_id = job.id, entry = %job.entry, "Job cancelled before start");
        JobOutcome::Cancelled
    } else {
        match AssertUnwindSafe(handler.handle(&job)).catch_unwind().await {
            Ok(Ok(message)) => {
                info!(role = %job.role_name, job_id = job.id, worker, "Processed entry: {}", message);
                JobOutcome::Succeeded(message)
            }
            Ok(Err(e)) => {
                warn!(role = %job.role_name, job_id = job.id, worker, entry = %job.entry, "Processed entry: {}", e);
                JobOutcome::Failed(e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(role = %job.role_name, job_id = job.id, worker, entry = %job.entry, "Job panicked: {}", message);
                JobOutcome::Panicked(message)
            }
        }
    };

    JobReport {
        id: job.id,
        entry: job.entry,
        worker,
        outcome,
        elapsed: started.elapsed(),
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
