//! Jobs handed to the worker pool.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use certqueue_core::Storage;
use tokio_util::sync::CancellationToken;

/// One queued entry bound to the role it belongs to.
#[derive(Clone)]
pub struct Job {
    /// Position within the batch, starting at 0.
    pub id: u64,
    pub role_name: String,
    /// Entry name relative to `import_path`.
    pub entry: String,
    /// Queue folder of the role, ending in `/`.
    pub import_path: String,
    pub storage: Arc<dyn Storage>,
    /// Cancelled when the owning scheduler stops.
    pub ctx: CancellationToken,
}

impl Job {
    /// Full storage key of the entry.
    pub fn key(&self) -> String {
        format!("{}{}", self.import_path, self.entry)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("role_name", &self.role_name)
            .field("entry", &self.entry)
            .field("import_path", &self.import_path)
            .field("cancelled", &self.ctx.is_cancelled())
            .finish()
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The entry was imported; carries the result message.
    Succeeded(String),
    /// The entry stays queued; carries the error message.
    Failed(String),
    /// The handler panicked; carries the panic message.
    Panicked(String),
    /// The job was not started because its context was cancelled.
    Cancelled,
}

/// Result of one job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub id: u64,
    pub entry: String,
    pub worker: usize,
    pub outcome: JobOutcome,
    pub elapsed: Duration,
}

/// Results of one batch, ordered by job id.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Succeeded(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed(_)))
    }

    pub fn panicked(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Panicked(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Cancelled))
    }

    fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.jobs.iter().filter(|j| pred(&j.outcome)).count()
    }
}
