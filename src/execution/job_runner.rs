//! # External Job Runners
//!
//! The capability that turns a parameter into an artifact on disk. The
//! server only depends on [`ExternalJobRunner`]; [`SimulatedJobRunner`]
//! stands in for a real MPI launch and the command runner shells out.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ChainError;
use crate::execution::artifacts::ArtifactRef;
use crate::messaging::Parameter;

/// One job submission
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub parameter: Parameter,
    pub delay: Duration,
    pub artifact: ArtifactRef,
}

/// Runs one external computation to completion.
///
/// Implementations resolve `Ok` only once the artifact is fully written and
/// closed. They do not retry.
#[async_trait]
pub trait ExternalJobRunner: Send + Sync + Debug {
    async fn run(&self, request: JobRequest) -> Result<ArtifactRef, ChainError>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// Derives a job's delay from its parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    time_unit: Duration,
}

impl DelayPolicy {
    pub fn new(time_unit: Duration) -> Self {
        Self { time_unit }
    }

    /// Number of time units for `parameter`: `1 + (p mod 2)`
    pub fn units_for(&self, parameter: Parameter) -> u32 {
        1 + parameter.value().rem_euclid(2) as u32
    }

    pub fn delay_for(&self, parameter: Parameter) -> Duration {
        self.time_unit * self.units_for(parameter)
    }
}

/// Sleeps for the requested delay and writes one pseudo-random integer
#[derive(Debug, Default, Clone)]
pub struct SimulatedJobRunner;

impl SimulatedJobRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExternalJobRunner for SimulatedJobRunner {
    async fn run(&self, request: JobRequest) -> Result<ArtifactRef, ChainError> {
        let JobRequest {
            parameter,
            delay,
            artifact,
        } = request;

        debug!(
            "🧪 SIMULATE: parameter {} sleeping {:?} before writing {}",
            parameter, delay, artifact
        );
        tokio::time::sleep(delay).await;

        let value = fastrand::u16(0..32768);
        let mut file = tokio::fs::File::create(artifact.path())
            .await
            .map_err(|e| ChainError::job_execution(parameter, format!("cannot create {artifact}: {e}")))?;
        file.write_all(format!("{value}\n").as_bytes())
            .await
            .map_err(|e| ChainError::job_execution(parameter, format!("cannot write {artifact}: {e}")))?;
        file.sync_all()
            .await
            .map_err(|e| ChainError::job_execution(parameter, format!("cannot flush {artifact}: {e}")))?;
        drop(file);

        info!("✅ SIMULATE: parameter {} wrote {} to {}", parameter, value, artifact);
        Ok(artifact)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
