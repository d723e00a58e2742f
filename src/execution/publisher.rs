//! # Result Publisher
//!
//! Second stage of every task chain: read the artifact a job produced, parse
//! its first line as the result value, and put `(parameter, value)` on the
//! result queue.

use tracing::{debug, warn};

use crate::config::RetentionPolicy;
use crate::error::ChainError;
use crate::execution::artifacts::ArtifactRef;
use crate::logging::{log_chain_operation, log_error};
use crate::messaging::{Parameter, ResultPair, ResultValue, TypedQueue};

#[derive(Debug, Clone)]
pub struct ResultPublisher {
    results: TypedQueue<ResultPair>,
    retention: RetentionPolicy,
}

impl ResultPublisher {
    pub fn new(results: TypedQueue<ResultPair>, retention: RetentionPolicy) -> Self {
        Self { results, retention }
    }

    /// Parse an artifact's content: the first line, trimmed, as an integer
    pub fn parse_artifact(artifact: &ArtifactRef, content: &str) -> Result<ResultValue, ChainError> {
        let first_line = content.lines().next().unwrap_or("").trim();
        first_line
            .parse::<ResultValue>()
            .map_err(|_| ChainError::artifact_format(artifact.path(), first_line))
    }

    /// Read, parse and enqueue the result for `parameter`
    pub async fn publish(
        &self,
        parameter: Parameter,
        artifact: &ArtifactRef,
    ) -> Result<ResultPair, ChainError> {
        debug!("📥 PUBLISH: reading {} for parameter {}", artifact, parameter);

        let content = tokio::fs::read_to_string(artifact.path())
            .await
            .map_err(|e| ChainError::artifact_read(artifact.path(), e.to_string()))?;
        let value = Self::parse_artifact(artifact, &content)?;
        let pair = ResultPair(parameter, value);

        self.results
            .put(&pair)
            .await
            .map_err(|e| ChainError::transport(parameter, e.to_string()))?;

        log_chain_operation(
            "publish",
            parameter,
            "published",
            Some(&format!("{} -> {}", artifact, value)),
        );

        // Retention trouble never undoes a publish that already happened
        if let Err(e) = self.retention.apply(artifact).await {
            warn!("🗑️ PUBLISH: could not remove {}: {}", artifact, e);
            log_error("publisher", "retention", &e.to_string(), Some(&artifact.to_string()));
        }

        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::MethodServerQueues;
    use std::time::Duration;
    use tempfile::TempDir;

    fn publisher(queues: &MethodServerQueues) -> ResultPublisher {
        ResultPublisher::new(queues.results.clone(), RetentionPolicy::Keep)
    }

    #[tokio::test]
    async fn test_publish_enqueues_pair() {
        let dir = TempDir::new().unwrap();
        let artifact = ArtifactRef::new(dir.path().join("simulate_4.out"));
        tokio::fs::write(artifact.path(), "2718\n").await.unwrap();
        let queues = MethodServerQueues::in_memory("publish");

        let pair = publisher(&queues)
            .publish(Parameter::new(4), &artifact)
            .await
            .unwrap();

        assert_eq!(pair, ResultPair(Parameter::new(4), 2718));
        let queued = queues
            .get_result(Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert_eq!(queued, Some(pair));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_read_error() {
        let dir = TempDir::new().unwrap();
        let artifact = ArtifactRef::new(dir.path().join("never_written.out"));
        let queues = MethodServerQueues::in_memory("publish");

        let err = publisher(&queues)
            .publish(Parameter::new(1), &artifact)
            .await
            .unwrap_err();

        assert!(matches!(err, ChainError::ArtifactRead { .. }));
        let queued = queues
            .get_result(Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(queued.is_none());
    }

    #[tokio::test]
    async fn test_garbage_artifact_is_format_error() {
        let dir = TempDir::new().unwrap();
        let artifact = ArtifactRef::new(dir.path().join("simulate_2.out"));
        tokio::fs::write(artifact.path(), "not a number\n").await.unwrap();
        let queues = MethodServerQueues::in_memory("publish");

        let err = publisher(&queues)
            .publish(Parameter::new(2), &artifact)
            .await
            .unwrap_err();

        match err {
            ChainError::ArtifactFormat { content, .. } => assert_eq!(content, "not a number"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_uses_first_line_only() {
        let artifact = ArtifactRef::new("x.out");
        assert_eq!(
            ResultPublisher::parse_artifact(&artifact, "  17 \ntrailing\n").unwrap(),
            17
        );
        assert!(ResultPublisher::parse_artifact(&artifact, "").is_err());
    }

    #[tokio::test]
    async fn test_delete_after_publish_removes_artifact() {
        let dir = TempDir::new().unwrap();
        let artifact = ArtifactRef::new(dir.path().join("simulate_6.out"));
        tokio::fs::write(artifact.path(), "5\n").await.unwrap();
        let queues = MethodServerQueues::in_memory("publish");
        let publisher =
            ResultPublisher::new(queues.results.clone(), RetentionPolicy::DeleteAfterPublish);

        publisher.publish(Parameter::new(6), &artifact).await.unwrap();
        assert!(!artifact.path().exists());
    }
}
