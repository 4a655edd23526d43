//! Task records and their bookkeeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// A periodic task body. Called once per tick.
pub type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// What `register` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new task was created.
    Started,
    /// Same interval and concurrency: the function was swapped, the timer kept.
    Updated,
    /// Interval or concurrency changed: the old timer was cancelled and a new one started.
    Restarted,
}

/// Run counters of one task.
#[derive(Debug, Default)]
pub(crate) struct TaskStats {
    runs: AtomicU64,
    panics: AtomicU64,
    skipped: AtomicU64,
    last_started_at: Mutex<Option<DateTime<Utc>>>,
    last_finished_at: Mutex<Option<DateTime<Utc>>>,
}

impl TaskStats {
    pub(crate) fn mark_started(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        *self.last_started_at.lock() = Some(Utc::now());
    }

    pub(crate) fn mark_finished(&self) {
        *self.last_finished_at.lock() = Some(Utc::now());
    }

    pub(crate) fn mark_panicked(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// A registered task.
pub(crate) struct TaskRecord {
    pub(crate) interval: Duration,
    pub(crate) concurrency: usize,
    pub(crate) func: Arc<RwLock<TaskFn>>,
    pub(crate) permits: Arc<Semaphore>,
    pub(crate) cancel: CancellationToken,
    pub(crate) stats: Arc<TaskStats>,
    pub(crate) registered_at: DateTime<Utc>,
}

impl TaskRecord {
    pub(crate) fn info(&self, name: &str) -> TaskInfo {
        TaskInfo {
            name: name.to_string(),
            interval: self.interval,
            concurrency: self.concurrency,
            runs: self.stats.runs.load(Ordering::Relaxed),
            panics: self.stats.panics.load(Ordering::Relaxed),
            skipped_ticks: self.stats.skipped.load(Ordering::Relaxed),
            in_flight: self.concurrency - self.permits.available_permits(),
            registered_at: self.registered_at,
            last_started_at: *self.stats.last_started_at.lock(),
            last_finished_at: *self.stats.last_finished_at.lock(),
        }
    }
}

/// Snapshot of a task's state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: String,
    pub interval: Duration,
    pub concurrency: usize,
    /// Executions started since registration.
    pub runs: u64,
    /// Executions that panicked.
    pub panics: u64,
    /// Ticks dropped because `concurrency` executions were already running.
    pub skipped_ticks: u64,
    /// Executions currently running.
    pub in_flight: usize,
    pub registered_at: DateTime<Utc>,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
}
