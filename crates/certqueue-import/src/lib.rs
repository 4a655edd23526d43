//! # certqueue import
//!
//! Periodically drains per-role queues of issued certificates.
//!
//! ## Flow
//!
//! - The controller task reconciles one `fillqueue-<role>` task per role
//! - Each filler checks leadership, lists `import-queue/<role>/` and feeds
//!   the entries through a bounded worker pool
//! - Each job decodes the certificate, runs the role's external command and
//!   deletes the entry; failures leave it queued for the next tick

pub mod backend;
pub mod certificate;
pub mod command;
pub mod controller;
pub mod error;
pub mod filler;
pub mod job;
pub mod processor;
pub mod queue;
pub mod worker;

#[cfg(test)]
mod testing;

pub use backend::ImportBackend;
pub use certificate::{IssuedCertificate, der_from_file_contents};
pub use command::{COMMON_NAME_PLACEHOLDER, CERT_FILE_PLACEHOLDER, substitute_placeholders};
pub use controller::{CONTROLLER_TASK_NAME, FILLER_TASK_PREFIX, QueueController, ReconcileReport};
pub use error::ImportError;
pub use filler::{FillOutcome, QueueFiller};
pub use job::{BatchReport, Job, JobOutcome, JobReport};
pub use processor::ImportProcessor;
pub use queue::{
    IMPORT_QUEUE_PREFIX, enqueue_certificate, list_all_entries, list_role_entries, purge_role_queue,
    queue_path,
};
pub use worker::{JobHandler, WorkerPool};
