//! Tracing subscriber setup.

use std::sync::OnceLock;

use certqueue_config::{ConfigLoader, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` overrides `config.level`. When `config.directory` is set, a
/// daily-rotated file receives the same events without colors.
pub(crate) fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let console = if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    };

    let file = match &config.directory {
        Some(dir) => {
            let dir = ConfigLoader::expand_path(dir);
            std::fs::create_dir_all(&dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("certqueue")
                .filename_suffix("log")
                .max_log_files(config.max_log_files)
                .build(&dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);

            let layer = if config.json {
                fmt::layer().json().with_writer(writer).boxed()
            } else {
                fmt::layer().with_writer(writer).with_ansi(false).boxed()
            };
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}
