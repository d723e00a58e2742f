//! Shared fixtures for method server integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use method_server::config::ServerConfig;
use method_server::error::ChainError;
use method_server::execution::{ArtifactRef, ExternalJobRunner, JobRequest};
use method_server::messaging::{
    MessagingError, MessagingResult, MethodServerQueues, Parameter, QueueBackend, ResultPair,
};

/// Configuration with a short delay unit and artifacts under `output_dir`
pub fn test_config(output_dir: &Path, time_unit_ms: u64) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.artifacts.output_dir = output_dir.to_path_buf();
    config.jobs.time_unit_ms = time_unit_ms;
    config
}

/// Deterministic job runner: sleeps the requested delay, writes `p * 100`,
/// and fails for every parameter in `failing`.
///
/// Parameters in `garbage` get an artifact that is not an integer; those in
/// `missing` report success without writing one.
#[derive(Debug, Default)]
pub struct ScriptedJobRunner {
    failing: HashSet<i64>,
    garbage: HashSet<i64>,
    missing: HashSet<i64>,
    runs: AtomicUsize,
}

impl ScriptedJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(parameters: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing: parameters.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_garbage(mut self, parameters: impl IntoIterator<Item = i64>) -> Self {
        self.garbage.extend(parameters);
        self
    }

    pub fn with_missing(mut self, parameters: impl IntoIterator<Item = i64>) -> Self {
        self.missing.extend(parameters);
        self
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn value_for(parameter: i64) -> i64 {
        parameter * 100
    }
}

#[async_trait]
impl ExternalJobRunner for ScriptedJobRunner {
    async fn run(&self, request: JobRequest) -> Result<ArtifactRef, ChainError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(request.delay).await;

        let p = request.parameter.value();
        if self.failing.contains(&p) {
            return Err(ChainError::job_execution(
                request.parameter,
                "simulation exited with status 1",
            ));
        }

        if self.missing.contains(&p) {
            return Ok(request.artifact);
        }
        let contents = if self.garbage.contains(&p) {
            "not a number\n".to_string()
        } else {
            format!("{}\n", Self::value_for(p))
        };
        tokio::fs::write(request.artifact.path(), contents)
            .await
            .map_err(|e| ChainError::job_execution(request.parameter, e.to_string()))?;
        Ok(request.artifact)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Input queue that replays fixed payloads and then loses its connection
#[derive(Debug)]
pub struct FlakyQueue {
    name: String,
    payloads: Mutex<VecDeque<String>>,
}

impl FlakyQueue {
    pub fn new(name: &str, payloads: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            payloads: Mutex::new(payloads.iter().map(|p| p.to_string()).collect()),
        }
    }
}

#[async_trait]
impl QueueBackend for FlakyQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, payload: String) -> MessagingResult<()> {
        self.payloads.lock().push_back(payload);
        Ok(())
    }

    async fn pop(&self, _timeout: Option<Duration>) -> MessagingResult<Option<String>> {
        match self.payloads.lock().pop_front() {
            Some(payload) => Ok(Some(payload)),
            None => Err(MessagingError::connection("connection reset by broker")),
        }
    }
}

/// Result queue that refuses every push
#[derive(Debug)]
pub struct RejectingQueue {
    name: String,
}

impl RejectingQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl QueueBackend for RejectingQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, _payload: String) -> MessagingResult<()> {
        Err(MessagingError::queue_closed(&self.name))
    }

    async fn pop(&self, _timeout: Option<Duration>) -> MessagingResult<Option<String>> {
        Ok(None)
    }
}

/// Send each parameter, then the shutdown sentinel
pub async fn enqueue_run(queues: &MethodServerQueues, parameters: &[i64]) {
    for &p in parameters {
        queues.send_parameter(Parameter::new(p)).await.unwrap();
    }
    queues.send_shutdown().await.unwrap();
}

/// Everything currently on the result queue, in queue order
pub async fn collect_results(queues: &MethodServerQueues) -> Vec<ResultPair> {
    let mut results = Vec::new();
    while let Some(pair) = queues
        .get_result(Some(Duration::from_millis(50)))
        .await
        .unwrap()
    {
        results.push(pair);
    }
    results
}
