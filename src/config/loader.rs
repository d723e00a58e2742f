//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate: a base file, an
//! optional per-environment override file next to it, then environment
//! variables.

use super::error::{ConfigResult, ConfigurationError};
use super::ServerConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable prefix for overrides, e.g. `METHOD_SERVER_QUEUES__PORT`
pub const ENV_PREFIX: &str = "METHOD_SERVER";

/// Base configuration file looked up when none is given explicitly
pub const DEFAULT_CONFIG_FILE: &str = "config/method-server.yaml";

/// Loaded, validated configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: ServerConfig,
    environment: String,
    config_file: Option<PathBuf>,
}

impl ConfigManager {
    /// Load from the default file (if present) and the environment
    pub fn load() -> ConfigResult<ConfigManager> {
        let default_file = PathBuf::from(DEFAULT_CONFIG_FILE);
        let file = default_file.exists().then_some(default_file);
        Self::load_with(file.as_deref(), &Self::detect_environment(), ENV_PREFIX)
    }

    /// Load from an explicit file, which must exist
    pub fn load_from_file(path: &Path) -> ConfigResult<ConfigManager> {
        if !path.exists() {
            return Err(ConfigurationError::config_file_not_found(path));
        }
        Self::load_with(Some(path), &Self::detect_environment(), ENV_PREFIX)
    }

    /// Load with every input explicit; tests use a private `env_prefix` so
    /// they do not observe each other's variables.
    pub fn load_with(
        file: Option<&Path>,
        environment: &str,
        env_prefix: &str,
    ) -> ConfigResult<ConfigManager> {
        // Defaults go in as a source of their own so that files and
        // environment variables can override single nested keys.
        let defaults = Config::try_from(&ServerConfig::default())
            .map_err(|e| ConfigurationError::load_error("defaults", e))?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = file {
            debug!(
                "Loading configuration for environment '{}' from {}",
                environment,
                path.display()
            );
            builder = builder.add_source(File::from(path).required(true));

            let override_path = Self::environment_override_path(path, environment);
            if override_path.exists() {
                debug!("Applying environment override {}", override_path.display());
                builder = builder.add_source(File::from(override_path.as_path()).required(true));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let source_name = file
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config: ServerConfig = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| ConfigurationError::load_error(source_name, e))?;

        config.validate()?;

        info!(
            environment = environment,
            broker_host = %config.queues.host,
            broker_port = config.queues.port,
            profile = ?config.execution.profile,
            "⚙️ CONFIG: Configuration loaded successfully"
        );

        Ok(ConfigManager {
            config,
            environment: environment.to_string(),
            config_file: file.map(Path::to_path_buf),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Mutable access for command line overrides; call [`Self::revalidate`] after
    pub fn config_mut(&mut self) -> &mut ServerConfig {
        &mut self.config
    }

    pub fn revalidate(&self) -> ConfigResult<()> {
        self.config.validate()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Detect the current environment, defaulting to development
    pub fn detect_environment() -> String {
        env::var("METHOD_SERVER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// `config/method-server.yaml` + `test` → `config/method-server.test.yaml`
    fn environment_override_path(path: &Path, environment: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match path.extension() {
            Some(ext) => format!("{stem}.{environment}.{}", ext.to_string_lossy()),
            None => format!("{stem}.{environment}"),
        };
        path.with_file_name(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionProfile, RetentionPolicy};
    use std::fs;
    use tempfile::TempDir;

    fn create_test_config_yaml() -> &'static str {
        r#"
queues:
  host: broker.internal
  port: 6380
  prefix: sim
execution:
  profile: threads
  local_pool:
    label: local_threads
    max_workers: 8
artifacts:
  output_dir: /tmp/sim-outputs
  retention: delete_after_publish
jobs:
  time_unit_ms: 250
"#
    }

    fn setup_test_config_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("method-server.yaml");
        fs::write(&config_file, create_test_config_yaml()).unwrap();
        (temp_dir, config_file)
    }

    #[test]
    fn test_basic_config_loading() {
        let (_temp_dir, config_file) = setup_test_config_dir();

        let manager =
            ConfigManager::load_with(Some(&config_file), "development", "MS_TEST_BASIC").unwrap();
        let config = manager.config();

        assert_eq!(config.queues.host, "broker.internal");
        assert_eq!(config.queues.port, 6380);
        assert_eq!(config.queues.input_queue_name(), "sim_inputs");
        assert_eq!(config.execution.profile, ExecutionProfile::Threads);
        assert_eq!(config.execution.external_workers(), 8);
        assert_eq!(config.artifacts.retention, RetentionPolicy::DeleteAfterPublish);
        assert_eq!(config.jobs.time_unit_ms, 250);

        // Sections absent from the file keep their defaults
        assert_eq!(config.execution.external_pool.label, "htex");
        assert_eq!(config.queues.poll_interval_ms, 1000);
        assert_eq!(manager.config_file(), Some(config_file.as_path()));
    }

    #[test]
    fn test_environment_specific_overrides() {
        let (temp_dir, config_file) = setup_test_config_dir();
        fs::write(
            temp_dir.path().join("method-server.test.yaml"),
            "queues:\n  port: 7000\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_with(Some(&config_file), "test", "MS_TEST_OVERRIDE").unwrap();
        assert_eq!(manager.config().queues.port, 7000);
        assert_eq!(manager.config().queues.host, "broker.internal");
        assert_eq!(manager.environment(), "test");

        let manager =
            ConfigManager::load_with(Some(&config_file), "production", "MS_TEST_OVERRIDE").unwrap();
        assert_eq!(manager.config().queues.port, 6380);
    }

    #[test]
    fn test_environment_variables_override_file() {
        let (_temp_dir, config_file) = setup_test_config_dir();
        env::set_var("MS_TEST_ENVVAR_QUEUES__PORT", "6390");
        env::set_var("MS_TEST_ENVVAR_EXECUTION__EXTERNAL_POOL__MAX_WORKERS", "3");

        let manager =
            ConfigManager::load_with(Some(&config_file), "development", "MS_TEST_ENVVAR").unwrap();

        env::remove_var("MS_TEST_ENVVAR_QUEUES__PORT");
        env::remove_var("MS_TEST_ENVVAR_EXECUTION__EXTERNAL_POOL__MAX_WORKERS");

        assert_eq!(manager.config().queues.port, 6390);
        assert_eq!(manager.config().execution.external_pool.max_workers, 3);
    }

    #[test]
    fn test_defaults_without_file() {
        let manager = ConfigManager::load_with(None, "development", "MS_TEST_NOFILE").unwrap();
        assert_eq!(manager.config().queues.port, 6379);
        assert!(manager.config_file().is_none());
    }

    #[test]
    fn test_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.yaml");

        let result = ConfigManager::load_from_file(&missing);
        assert!(matches!(
            result,
            Err(ConfigurationError::ConfigFileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("method-server.yaml");
        fs::write(&config_file, "jobs:\n  time_unit_ms: 0\n").unwrap();

        let result = ConfigManager::load_with(Some(&config_file), "development", "MS_TEST_INVALID");
        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }

    #[test]
    fn test_override_path_naming() {
        let path = ConfigManager::environment_override_path(
            Path::new("config/method-server.yaml"),
            "test",
        );
        assert_eq!(path, PathBuf::from("config/method-server.test.yaml"));
    }
}
