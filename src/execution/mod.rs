//! # Execution Module
//!
//! Everything that runs work: the named execution pools, artifact
//! allocation, the external job runners and the result publisher.

pub mod artifacts;
pub mod command_runner;
pub mod job_runner;
pub mod pool;
pub mod publisher;

use std::sync::Arc;

pub use artifacts::{ArtifactAllocator, ArtifactLease, ArtifactRef};
pub use command_runner::CommandJobRunner;
pub use job_runner::{DelayPolicy, ExternalJobRunner, JobRequest, SimulatedJobRunner};
pub use pool::{ExecutionPool, ExecutionPools};
pub use publisher::ResultPublisher;

use crate::config::{JobConfig, RunnerKind};

/// Build the job runner selected by the configuration
pub fn runner_from_config(config: &JobConfig) -> Arc<dyn ExternalJobRunner> {
    match config.runner {
        RunnerKind::Simulated => Arc::new(SimulatedJobRunner::new()),
        RunnerKind::Command => Arc::new(CommandJobRunner::from_config(config)),
    }
}
