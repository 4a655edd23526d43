//! Foreground import queue process.

use std::sync::Arc;

use certqueue_config::Config;
use certqueue_import::ImportBackend;
use certqueue_scheduler::TaskScheduler;
use tracing::info;

use crate::setup::{open_storage, replication_source};

/// Run the import queue until Ctrl-C.
pub(crate) async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting certqueue v{}", env!("CARGO_PKG_VERSION"));

    let storage = open_storage(&config.storage).await?;
    let replication = replication_source(&config.replication);
    let scheduler = Arc::new(TaskScheduler::new());

    let backend = ImportBackend::new(storage, replication, scheduler, &config.import);
    backend.start()?;
    info!(
        workers = config.import.workers,
        filler_interval_ms = config.import.filler_interval_ms,
        "Import queue running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    backend.stop();
    Ok(())
}
