//! Task scheduler.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::SchedulerError;
use crate::panic::panic_message;
use crate::task::{Registration, TaskFn, TaskInfo, TaskRecord, TaskStats};

/// Registry of named periodic tasks.
///
/// Every task gets its own ticker. The first tick fires immediately, later
/// ticks every `interval`; ticks missed while the runtime was busy are
/// skipped rather than replayed. Each execution runs on its own tokio task,
/// so a slow execution never delays other tasks.
///
/// Registering and removing tasks must happen inside a tokio runtime.
/// Dropping the scheduler stops every ticker.
pub struct TaskScheduler {
    tasks: DashMap<String, TaskRecord>,
    shutdown: CancellationToken,
    stopped: AtomicBool,
}

impl TaskScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            shutdown: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Install or replace a periodic task.
    ///
    /// Re-registering a name with the same interval and concurrency swaps
    /// the function without touching the timer, so callers may re-register
    /// on every reconciliation pass without resetting the task's clock.
    /// A changed interval restarts the ticker but keeps the concurrency
    /// permits, so executions still running from the old ticker count
    /// against the limit. A changed concurrency starts from fresh permits.
    pub fn register<F, Fut>(
        &self,
        name: impl Into<String>,
        f: F,
        concurrency: usize,
        interval: Duration,
    ) -> Result<Registration, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let func: TaskFn = Arc::new(move || f().boxed());
        self.register_fn(name.into(), func, concurrency, interval)
    }

    /// [`register`](Self::register) for an already boxed function.
    pub fn register_fn(
        &self,
        name: String,
        func: TaskFn,
        concurrency: usize,
        interval: Duration,
    ) -> Result<Registration, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval(name));
        }
        if concurrency == 0 {
            return Err(SchedulerError::InvalidConcurrency(name));
        }

        let entry = self.tasks.entry(name);
        // Checked with the shard lock held so `stop` cannot clear in between.
        if self.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::Stopped);
        }

        match entry {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get();
                if record.interval == interval && record.concurrency == concurrency {
                    *record.func.write() = func;
                    debug!(task = %occupied.key(), "Task function updated");
                    return Ok(Registration::Updated);
                }

                record.cancel.cancel();
                let permits = (record.concurrency == concurrency).then(|| record.permits.clone());
                let record = self.spawn_task(occupied.key(), func, concurrency, interval, permits);
                occupied.insert(record);
                info!(
                    task = %occupied.key(),
                    interval_ms = interval.as_millis() as u64,
                    concurrency,
                    "Task restarted with new schedule"
                );
                Ok(Registration::Restarted)
            }
            Entry::Vacant(vacant) => {
                let record = self.spawn_task(vacant.key(), func, concurrency, interval, None);
                info!(
                    task = %vacant.key(),
                    interval_ms = interval.as_millis() as u64,
                    concurrency,
                    "Task registered"
                );
                vacant.insert(record);
                Ok(Registration::Started)
            }
        }
    }

    /// Remove a task. Running executions finish; no further ticks fire.
    ///
    /// Returns `false` if no task had that name.
    pub fn del(&self, name: &str) -> bool {
        match self.tasks.remove(name) {
            Some((_, record)) => {
                record.cancel.cancel();
                info!(task = %name, "Task removed");
                true
            }
            None => false,
        }
    }

    /// Names of all registered tasks, in no particular order.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Snapshot of one task's bookkeeping.
    pub fn task_info(&self, name: &str) -> Option<TaskInfo> {
        self.tasks.get(name).map(|record| record.info(name))
    }

    /// Check if a task is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if no task is registered.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether the scheduler still accepts tasks.
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// A token cancelled when the scheduler stops.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Cancel every ticker and clear the registry.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        let count = self.tasks.len();
        self.tasks.clear();
        info!("Scheduler stopped ({} task(s) cancelled)", count);
    }

    fn spawn_task(
        &self,
        name: &str,
        func: TaskFn,
        concurrency: usize,
        interval: Duration,
        permits: Option<Arc<Semaphore>>,
    ) -> TaskRecord {
        let record = TaskRecord {
            interval,
            concurrency,
            func: Arc::new(RwLock::new(func)),
            permits: permits.unwrap_or_else(|| Arc::new(Semaphore::new(concurrency))),
            cancel: self.shutdown.child_token(),
            stats: Arc::new(TaskStats::default()),
            registered_at: Utc::now(),
        };

        tokio::spawn(run_ticker(
            name.to_string(),
            interval,
            record.func.clone(),
            record.permits.clone(),
            record.stats.clone(),
            record.cancel.clone(),
        ));

        record
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_ticker(
    name: String,
    interval: Duration,
    func: Arc<RwLock<TaskFn>>,
    permits: Arc<Semaphore>,
    stats: Arc<TaskStats>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Ok(permit) = permits.clone().try_acquire_owned() else {
            stats.mark_skipped();
            debug!(task = %name, "Previous run still in progress, skipping tick");
            continue;
        };

        let task_fn = func.read().clone();
        let task_stats = stats.clone();
        let task_name = name.clone();
        task_stats.mark_started();

        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async move { task_fn().await })
                .catch_unwind()
                .await;
            if let Err(payload) = outcome {
                task_stats.mark_panicked();
                error!(
                    task = %task_name,
                    "Scheduled task panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
            task_stats.mark_finished();
            drop(permit);
        });
    }

    debug!(task = %name, "Task ticker stopped");
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
