//! certqueue - leader-gated certificate import queue
//!
//! Main entry point for the certqueue CLI.

mod cli;
mod cmd_queue;
mod logging;
mod server;
mod setup;

use clap::Parser;
use tracing::warn;

use certqueue_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};
use crate::cmd_queue::handle_queue_command;
use crate::logging::init_tracing;
use crate::server::run_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config.logging)?;

    let warnings = ConfigValidator::validate(&config).into_result()?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    match cli.command {
        None | Some(Commands::Run) => run_server(config).await,
        Some(Commands::Queue { action }) => handle_queue_command(action, &config).await,
    }
}
