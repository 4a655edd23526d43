//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub replication: ReplicationConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

/// Storage backend kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One file per key under `path`.
    #[default]
    File,
    /// Process memory; contents are lost on exit.
    Memory,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory of the file backend. `~` is expanded.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> String {
    dirs::home_dir()
        .map(|h| h.join(".certqueue").join("data"))
        .unwrap_or_else(|| PathBuf::from(".certqueue/data"))
        .to_string_lossy()
        .into_owned()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<String>,

    /// Emit JSON lines instead of text.
    #[serde(default)]
    pub json: bool,

    /// Rotated files to keep.
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            json: false,
            max_log_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    14
}

/// Replication status of this node.
///
/// When `status_file` is set, the JSON file it names is re-read on every
/// filler tick and the static flags are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicationConfig {
    #[serde(default)]
    pub status_file: Option<String>,

    #[serde(default)]
    pub local_mount: bool,

    #[serde(default)]
    pub performance_secondary: bool,

    #[serde(default)]
    pub dr_secondary: bool,

    #[serde(default)]
    pub performance_standby: bool,
}

/// Import queue processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// How often the controller reconciles per-role fillers.
    #[serde(default = "default_controller_interval_ms")]
    pub controller_interval_ms: u64,

    /// How often each role's queue is drained.
    #[serde(default = "default_filler_interval_ms")]
    pub filler_interval_ms: u64,

    /// Workers per batch.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the job channel feeding the workers.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Directory for certificate files handed to external commands.
    #[serde(default)]
    pub temp_dir: Option<String>,

    /// Kill external commands after this many seconds. No limit when unset.
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

fn default_controller_interval_ms() -> u64 {
    1_000
}

fn default_filler_interval_ms() -> u64 {
    5_000
}

fn default_workers() -> usize {
    1
}

fn default_channel_capacity() -> usize {
    100
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            controller_interval_ms: default_controller_interval_ms(),
            filler_interval_ms: default_filler_interval_ms(),
            workers: default_workers(),
            channel_capacity: default_channel_capacity(),
            temp_dir: None,
            command_timeout_secs: None,
        }
    }
}

impl ImportConfig {
    pub fn controller_interval(&self) -> Duration {
        Duration::from_millis(self.controller_interval_ms)
    }

    pub fn filler_interval(&self) -> Duration {
        Duration::from_millis(self.filler_interval_ms)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    pub fn temp_dir_path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_deref()
            .map(|dir| PathBuf::from(shellexpand::tilde(dir).as_ref()))
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
