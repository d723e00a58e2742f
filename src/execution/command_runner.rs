//! Shell command job runner.
//!
//! Renders a command template and runs it through a shell; the command is
//! expected to leave its result in `{output}`.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::artifacts::ArtifactRef;
use super::job_runner::{ExternalJobRunner, JobRequest};
use crate::config::JobConfig;
use crate::error::ChainError;

#[derive(Debug, Clone)]
pub struct CommandJobRunner {
    shell: String,
    template: String,
}

impl CommandJobRunner {
    pub fn new(shell: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            template: template.into(),
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(config.shell.clone(), config.command_template.clone())
    }

    /// Substitute `{params}`, `{delay}` and `{output}`
    pub fn render(&self, request: &JobRequest) -> String {
        self.template
            .replace("{params}", &request.parameter.to_string())
            .replace("{delay}", &format!("{:.3}", request.delay.as_secs_f64()))
            .replace("{output}", &request.artifact.path().display().to_string())
    }
}

#[async_trait]
impl ExternalJobRunner for CommandJobRunner {
    async fn run(&self, request: JobRequest) -> Result<ArtifactRef, ChainError> {
        let parameter = request.parameter;
        let script = self.render(&request);
        debug!("🐚 COMMAND: parameter {} running: {}", parameter, script);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ChainError::job_execution(parameter, format!("failed to launch {}: {e}", self.shell))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!("🐚 COMMAND: parameter {} stdout: {}", parameter, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("🐚 COMMAND: parameter {} stderr: {}", parameter, stderr.trim());
        }

        if !output.status.success() {
            warn!(
                "❌ COMMAND: parameter {} exited with {}",
                parameter, output.status
            );
            return Err(ChainError::job_execution(
                parameter,
                format!("command exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        match tokio::fs::metadata(request.artifact.path()).await {
            Ok(meta) if meta.is_file() => {
                info!("✅ COMMAND: parameter {} produced {}", parameter, request.artifact);
                Ok(request.artifact)
            }
            _ => Err(ChainError::job_execution(
                parameter,
                format!("command succeeded but produced no artifact at {}", request.artifact),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::Parameter;
    use std::time::Duration;
    use tempfile::TempDir;

    fn request(dir: &TempDir, parameter: i64) -> JobRequest {
        JobRequest {
            parameter: Parameter::new(parameter),
            delay: Duration::from_millis(10),
            artifact: ArtifactRef::new(dir.path().join(format!("simulate_{parameter}.out"))),
        }
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let runner = CommandJobRunner::new("sh", "sleep {delay}; run {params} -o {output}");
        let req = JobRequest {
            parameter: Parameter::new(3),
            delay: Duration::from_secs(2),
            artifact: ArtifactRef::new("outputs/simulate_3.out"),
        };
        assert_eq!(
            runner.render(&req),
            "sleep 2.000; run 3 -o outputs/simulate_3.out"
        );
    }

    #[tokio::test]
    async fn test_successful_command_produces_artifact() {
        let dir = TempDir::new().unwrap();
        let runner = CommandJobRunner::new("sh", "echo 1234 > {output}");

        let artifact = runner.run(request(&dir, 1)).await.unwrap();
        let content = tokio::fs::read_to_string(artifact.path()).await.unwrap();
        assert_eq!(content.trim(), "1234");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_job_failure() {
        let dir = TempDir::new().unwrap();
        let runner = CommandJobRunner::new("sh", "echo broken >&2; exit 3");

        let err = runner.run(request(&dir, 2)).await.unwrap_err();
        match err {
            ChainError::JobExecution { message, .. } => assert!(message.contains("broken")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_is_job_failure() {
        let dir = TempDir::new().unwrap();
        let runner = CommandJobRunner::new("sh", "true");

        let err = runner.run(request(&dir, 5)).await.unwrap_err();
        assert!(matches!(err, ChainError::JobExecution { .. }));
    }
}
