//! # Task Chains
//!
//! A task chain is the two-stage unit of work dispatched for one parameter:
//! the external job, then result publication as its continuation.
//!
//! The chain is observed through a [`ChainHandle`]. Because publication is
//! only scheduled once the job finishes, the root handle resolves to a
//! [`ChainLink::Indirection`] pointing at the publication handle, which in
//! turn resolves to a [`ChainLink::Terminal`] value:
//!
//! ```text
//! root handle ──▶ Indirection(result handle) ──▶ Terminal(Ok((p, value)))
//!            └──▶ Terminal(Err(JobExecution))      (job failed, no publish)
//! ```
//!
//! Handles are shared futures: resolving one twice yields the same link
//! without running anything again.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::constants::MAX_CHAIN_DEPTH;
use crate::error::ChainError;
use crate::execution::{
    ArtifactAllocator, ArtifactRef, DelayPolicy, ExecutionPools, ExternalJobRunner, JobRequest,
    ResultPublisher,
};
use crate::logging::log_chain_operation;
use crate::messaging::{Parameter, ResultPair};

/// Terminal value of a chain once every link is unwrapped
pub type ChainOutcome = Result<ResultPair, ChainError>;

/// What resolving one handle yields
#[derive(Clone)]
pub enum ChainLink {
    /// Final value of the chain
    Terminal(ChainOutcome),
    /// The chain continues in another handle
    Indirection(ChainHandle),
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainLink::Terminal(outcome) => f.debug_tuple("Terminal").field(outcome).finish(),
            ChainLink::Indirection(handle) => f
                .debug_tuple("Indirection")
                .field(&handle.parameter())
                .finish(),
        }
    }
}

/// Shareable, re-awaitable handle on one stage of a chain
#[derive(Clone)]
pub struct ChainHandle {
    parameter: Parameter,
    inner: Shared<BoxFuture<'static, ChainLink>>,
}

impl fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHandle")
            .field("parameter", &self.parameter)
            .field("resolved", &self.inner.peek().is_some())
            .finish()
    }
}

impl ChainHandle {
    /// Handle that is already resolved
    pub fn ready(parameter: Parameter, link: ChainLink) -> Self {
        Self {
            parameter,
            inner: futures::future::ready(link).boxed().shared(),
        }
    }

    /// Handle over a spawned task; a panicked task resolves to `Aborted`
    pub fn from_task(parameter: Parameter, task: JoinHandle<ChainLink>) -> Self {
        let inner = async move {
            match task.await {
                Ok(link) => link,
                Err(e) => ChainLink::Terminal(Err(ChainError::aborted(parameter, e.to_string()))),
            }
        }
        .boxed()
        .shared();
        Self { parameter, inner }
    }

    pub fn parameter(&self) -> Parameter {
        self.parameter
    }

    /// The resolved link, if this stage already finished
    pub fn peek(&self) -> Option<ChainLink> {
        self.inner.peek().cloned()
    }

    /// Wait for this stage
    pub async fn resolve(&self) -> ChainLink {
        self.inner.clone().await
    }

    /// Follow indirections until a terminal value.
    ///
    /// At most `max_depth` handles are resolved; a chain that still points
    /// further is reported as `DrainIntegrity` instead of being followed.
    pub async fn resolve_terminal(&self, max_depth: usize) -> ChainOutcome {
        let mut current = self.clone();
        for depth in 1..=max_depth {
            match current.resolve().await {
                ChainLink::Terminal(outcome) => return outcome,
                ChainLink::Indirection(next) => {
                    debug!(
                        "🔗 CHAIN: parameter {} unwrapped link {} of {}",
                        self.parameter, depth, max_depth
                    );
                    current = next;
                }
            }
        }
        Err(ChainError::DrainIntegrity {
            parameter: self.parameter,
            max_depth,
        })
    }
}

/// Registry record of one dispatch
#[derive(Debug, Clone)]
pub struct TaskChain {
    pub parameter: Parameter,
    pub artifact: ArtifactRef,
    pub dispatched_at: DateTime<Utc>,
    pub handle: ChainHandle,
}

impl TaskChain {
    /// Walk the chain to its terminal value with the standard depth cap
    pub async fn outcome(&self) -> ChainOutcome {
        self.handle.resolve_terminal(MAX_CHAIN_DEPTH).await
    }
}

/// Builds and schedules task chains
#[derive(Debug, Clone)]
pub struct ChainFactory {
    pools: ExecutionPools,
    runner: Arc<dyn ExternalJobRunner>,
    publisher: ResultPublisher,
    artifacts: ArtifactAllocator,
    delay_policy: DelayPolicy,
}

impl ChainFactory {
    pub fn new(
        pools: ExecutionPools,
        runner: Arc<dyn ExternalJobRunner>,
        publisher: ResultPublisher,
        artifacts: ArtifactAllocator,
        delay_policy: DelayPolicy,
    ) -> Self {
        Self {
            pools,
            runner,
            publisher,
            artifacts,
            delay_policy,
        }
    }

    /// Submit the job for `parameter` and schedule its publication.
    ///
    /// Never waits on the job. A submission failure is recorded as the
    /// chain's terminal value.
    pub async fn spawn(&self, parameter: Parameter) -> TaskChain {
        let lease = self.artifacts.allocate(parameter);
        let artifact = lease.artifact().clone();
        let dispatched_at = Utc::now();

        if let Err(e) = self.artifacts.ensure_output_dir().await {
            let error = ChainError::job_execution(
                parameter,
                format!(
                    "cannot create output directory {}: {e}",
                    self.artifacts.output_dir().display()
                ),
            );
            log_chain_operation("submit", parameter, "failed", Some(&error.to_string()));
            return TaskChain {
                parameter,
                artifact,
                dispatched_at,
                handle: ChainHandle::ready(parameter, ChainLink::Terminal(Err(error))),
            };
        }

        let delay = self.delay_policy.delay_for(parameter);
        let request = JobRequest {
            parameter,
            delay,
            artifact: artifact.clone(),
        };

        let runner = self.runner.clone();
        let job = self
            .pools
            .external
            .submit(async move { runner.run(request).await });
        log_chain_operation(
            "submit",
            parameter,
            "submitted",
            Some(&format!("{} delay={:?} pool={}", artifact, delay, self.pools.external.label())),
        );

        let local = self.pools.local.clone();
        let publisher = self.publisher.clone();
        let continuation = self.pools.local.spawn_dependent(async move {
            match job.await {
                Ok(Ok(produced)) => {
                    log_chain_operation("job", parameter, "succeeded", Some(&produced.to_string()));
                    let publish = local.submit(async move {
                        let outcome = publisher.publish(parameter, &produced).await;
                        // The artifact path is free for reuse once it was read
                        drop(lease);
                        ChainLink::Terminal(outcome)
                    });
                    ChainLink::Indirection(ChainHandle::from_task(parameter, publish))
                }
                Ok(Err(error)) => {
                    log_chain_operation("job", parameter, "failed", Some(&error.to_string()));
                    ChainLink::Terminal(Err(error))
                }
                Err(join_error) => {
                    log_chain_operation("job", parameter, "aborted", Some(&join_error.to_string()));
                    ChainLink::Terminal(Err(ChainError::aborted(parameter, join_error.to_string())))
                }
            }
        });

        TaskChain {
            parameter,
            artifact,
            dispatched_at,
            handle: ChainHandle::from_task(parameter, continuation),
        }
    }
}
