//! # Method Server Configuration
//!
//! Explicit configuration handed to the dispatcher, the job runners and the
//! result publisher at construction time. Nothing here is process-global.
//!
//! ## Sources
//!
//! Values are layered, later sources winning:
//!
//! 1. serde defaults on every field
//! 2. an optional YAML/TOML file (default `config/method-server.yaml`)
//! 3. `METHOD_SERVER_<SECTION>__<KEY>` environment variables
//! 4. command line flags, applied by the binaries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use method_server::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//! println!("broker at {}:{}", config.queues.host, config.queues.port);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::DEFAULT_TIME_UNIT_MS;

pub use cli::{BrokerArgs, ServerArgs};
pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring method-server.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Broker address and queue naming
    pub queues: QueueConfig,

    /// Execution pool provisioning
    pub execution: ExecutionConfig,

    /// Where job artifacts go and how long they live
    pub artifacts: ArtifactConfig,

    /// External job runner selection and timing
    pub jobs: JobConfig,
}

/// Request/result queue configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub host: String,
    pub port: u16,
    /// Queues are named `<prefix>_inputs` and `<prefix>_results`
    pub prefix: String,
    /// Length of each blocking pop slice while waiting without a timeout
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            prefix: "method_server".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

impl QueueConfig {
    pub fn input_queue_name(&self) -> String {
        format!("{}_inputs", self.prefix)
    }

    pub fn output_queue_name(&self) -> String {
        format!("{}_results", self.prefix)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// How execution resources are provisioned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionProfile {
    /// External jobs run on a thread pool sized like the local pool
    Threads,
    /// External jobs run on a dedicated pool capped at its own `max_workers`
    #[default]
    Pool,
}

/// A named execution pool
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    pub label: String,
    pub max_workers: usize,
}

/// Execution pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub profile: ExecutionProfile,
    /// Pool for out-of-process simulation jobs
    pub external_pool: PoolConfig,
    /// Pool for in-process continuations (artifact parsing, publishing)
    pub local_pool: PoolConfig,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            profile: ExecutionProfile::Pool,
            external_pool: PoolConfig {
                label: "htex".to_string(),
                max_workers: 2,
            },
            local_pool: PoolConfig {
                label: "local_threads".to_string(),
                max_workers: 4,
            },
        }
    }
}

impl ExecutionConfig {
    /// Effective worker count of the external pool under the active profile
    pub fn external_workers(&self) -> usize {
        match self.profile {
            ExecutionProfile::Threads => self.local_pool.max_workers,
            ExecutionProfile::Pool => self.external_pool.max_workers,
        }
    }
}

/// What happens to an artifact once its result was published
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    #[default]
    Keep,
    DeleteAfterPublish,
}

/// Artifact storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub output_dir: PathBuf,
    pub retention: RetentionPolicy,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            retention: RetentionPolicy::Keep,
        }
    }
}

/// Which external job runner to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// In-process sleep plus random artifact
    #[default]
    Simulated,
    /// Shell command built from `command_template`
    Command,
}

/// External job configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JobConfig {
    pub runner: RunnerKind,
    /// Length of one delay unit; a job for parameter `p` waits `1 + p mod 2` units
    pub time_unit_ms: u64,
    /// Placeholders: `{params}`, `{delay}` (seconds), `{output}`
    pub command_template: String,
    pub shell: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            runner: RunnerKind::Simulated,
            time_unit_ms: DEFAULT_TIME_UNIT_MS,
            command_template: "sleep {delay}\n\
                echo \"Running at $PWD\"\n\
                echo \"mpi_application {params} -o {output}\"\n\
                echo $RANDOM > {output}"
                .to_string(),
            shell: "bash".to_string(),
        }
    }
}

impl JobConfig {
    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }
}

impl ServerConfig {
    /// Check the invariants the server relies on at construction time
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.queues.host.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queues.host",
                "queue configuration",
            ));
        }

        if self.queues.prefix.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queues.prefix",
                "queue configuration",
            ));
        }

        if self.queues.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "queues.poll_interval_ms",
                "0",
                "poll interval must be greater than 0",
            ));
        }

        for (field, pool) in [
            ("execution.external_pool", &self.execution.external_pool),
            ("execution.local_pool", &self.execution.local_pool),
        ] {
            if pool.label.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    format!("{field}.label"),
                    "execution configuration",
                ));
            }
            if pool.max_workers == 0 {
                return Err(ConfigurationError::invalid_value(
                    format!("{field}.max_workers"),
                    "0",
                    "pool must have at least one worker",
                ));
            }
        }

        if self.execution.external_pool.label == self.execution.local_pool.label {
            return Err(ConfigurationError::invalid_value(
                "execution.local_pool.label",
                self.execution.local_pool.label.clone(),
                "external and local pools must have distinct labels",
            ));
        }

        if self.jobs.time_unit_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "jobs.time_unit_ms",
                "0",
                "time unit must be greater than 0",
            ));
        }

        if self.jobs.runner == RunnerKind::Command && self.jobs.command_template.trim().is_empty()
        {
            return Err(ConfigurationError::missing_required_field(
                "jobs.command_template",
                "command runner configuration",
            ));
        }

        Ok(())
    }
}
