//! Scheduler errors.

use thiserror::Error;

/// Scheduler error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler has been stopped.
    #[error("Scheduler is stopped")]
    Stopped,

    /// Interval must be non-zero.
    #[error("Invalid interval for task {0}: must be greater than zero")]
    InvalidInterval(String),

    /// Concurrency must be at least one.
    #[error("Invalid concurrency for task {0}: must be at least 1")]
    InvalidConcurrency(String),
}
