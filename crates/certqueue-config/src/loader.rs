//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in ENV_VAR_PATTERN.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.certqueue`).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StorageBackend;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.import.filler_interval_ms, 5_000);
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [storage]
            backend = "memory"

            [logging]
            level = "debug"
            json = true

            [replication]
            performance_standby = true

            [import]
            controller_interval_ms = 250
            filler_interval_ms = 2000
            workers = 4
            channel_capacity = 16
            temp_dir = "/var/tmp"
            command_timeout_secs = 60
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.replication.performance_standby);
        assert!(!config.replication.dr_secondary);
        assert_eq!(config.import.controller_interval_ms, 250);
        assert_eq!(config.import.workers, 4);
        assert_eq!(config.import.channel_capacity, 16);
        assert_eq!(config.import.temp_dir.as_deref(), Some("/var/tmp"));
        assert_eq!(config.import.command_timeout_secs, Some(60));
    }

    #[test]
    fn test_shipped_default_config() {
        let config = ConfigLoader::load_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.import.controller_interval_ms, 1_000);
        assert_eq!(config.import.filler_interval_ms, 5_000);
        assert_eq!(config.import.workers, 1);
        assert_eq!(config.import.channel_capacity, 100);
        assert!(config.replication.status_file.is_none());
        assert!(crate::ConfigValidator::validate(&config).is_valid());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[import]").unwrap();
        writeln!(file, "workers = 3").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.import.workers, 3);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.import.workers, 1);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("CERTQUEUE_TEST_DATA_DIR", "/srv/certqueue");
        }
        let content = "[storage]\npath = \"${CERTQUEUE_TEST_DATA_DIR}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.storage.path, "/srv/certqueue");
        unsafe {
            std::env::remove_var("CERTQUEUE_TEST_DATA_DIR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_CERTQUEUE_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path("~/data");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("data"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        assert_eq!(
            ConfigLoader::expand_path("/var/lib/certqueue"),
            PathBuf::from("/var/lib/certqueue")
        );
    }
}
