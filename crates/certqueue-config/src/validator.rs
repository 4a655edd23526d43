//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, StorageBackend};

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Problems found in a configuration.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Settings the process cannot run with.
    pub errors: Vec<ValidationIssue>,
    /// Settings that work but are probably not what was meant.
    pub warnings: Vec<ValidationIssue>,
}

/// One finding, keyed by the dotted path of the offending setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    /// Fail on the first error, otherwise hand back the warnings.
    pub fn into_result(self) -> Result<Vec<ValidationIssue>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(issue) => Err(ConfigError::InvalidValue {
                field: issue.path,
                message: issue.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_storage(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_import(config, &mut result);

        result
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        match config.storage.backend {
            StorageBackend::File if config.storage.path.trim().is_empty() => {
                result.error("storage.path", "path cannot be empty for the file backend");
            }
            StorageBackend::Memory => {
                result.warn(
                    "storage.backend",
                    "memory backend loses queued certificates on restart",
                );
            }
            StorageBackend::File => {}
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) && !level.contains('=') {
            result.warn(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            );
        }

        if config.logging.directory.is_some() && config.logging.max_log_files == 0 {
            result.error("logging.max_log_files", "max_log_files must be greater than 0");
        }
    }

    fn validate_import(config: &Config, result: &mut ValidationResult) {
        let import = &config.import;

        let positive = [
            ("import.controller_interval_ms", import.controller_interval_ms),
            ("import.filler_interval_ms", import.filler_interval_ms),
            ("import.workers", import.workers as u64),
            ("import.channel_capacity", import.channel_capacity as u64),
        ];
        for (path, value) in positive {
            if value == 0 {
                result.error(path, "must be greater than 0");
            }
        }

        if import.command_timeout_secs == Some(0) {
            result.error(
                "import.command_timeout_secs",
                "must be greater than 0 when set; omit it for no limit",
            );
        }

        if import.channel_capacity > 0 && import.workers > import.channel_capacity {
            result.warn(
                "import.workers",
                "more workers than channel slots, some workers will sit idle",
            );
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
