//! CLI definitions for certqueue.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// certqueue CLI.
#[derive(Parser, Debug)]
#[command(name = "certqueue")]
#[command(about = "Leader-gated certificate import queue")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the import queue in the foreground (default)
    Run,

    /// Inspect or feed the import queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum QueueAction {
    /// List pending certificates
    List {
        /// Only this role
        #[arg(long)]
        role: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Queue a certificate for import
    Enqueue {
        /// Role whose queue receives the certificate
        #[arg(long)]
        role: String,

        /// Entry name (default: the certificate's serial number in hex)
        #[arg(long)]
        serial: Option<String>,

        /// Certificate file, PEM or DER
        #[arg(long)]
        cert: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}
