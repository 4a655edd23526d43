//! # certqueue scheduler
//!
//! A registry of named periodic tasks. Each task ticks on its own timer,
//! runs at most `concurrency` executions at once, and survives panics in
//! its function. Tasks can be registered and removed while the scheduler
//! is running, including from inside another task.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use certqueue_scheduler::TaskScheduler;
//!
//! async fn example() {
//!     let scheduler = TaskScheduler::new();
//!     scheduler
//!         .register("heartbeat", || async { tracing::info!("tick") }, 1, Duration::from_secs(5))
//!         .unwrap();
//!
//!     scheduler.del("heartbeat");
//!     scheduler.stop();
//! }
//! ```

mod error;
mod panic;
mod scheduler;
mod task;

pub use error::SchedulerError;
pub use panic::panic_message;
pub use scheduler::TaskScheduler;
pub use task::{Registration, TaskFn, TaskInfo};
