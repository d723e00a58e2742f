//! # Method Server
//!
//! Wires configuration, queues, pools, the job runner and the publisher into
//! a dispatcher, then runs the listen-and-drain lifecycle.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::dispatcher::Dispatcher;
use super::drain::{drain, DrainReport};
use super::registry::TaskRegistry;
use super::task_chain::ChainFactory;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::execution::{
    runner_from_config, ArtifactAllocator, DelayPolicy, ExecutionPools, ExternalJobRunner,
    ResultPublisher,
};
use crate::messaging::MethodServerQueues;

#[derive(Debug)]
pub struct MethodServer {
    id: Uuid,
    config: ServerConfig,
    queues: MethodServerQueues,
    pools: ExecutionPools,
    dispatcher: Dispatcher,
}

impl MethodServer {
    /// Build a server over existing queues with an explicit job runner
    pub fn new(
        config: &ServerConfig,
        queues: MethodServerQueues,
        runner: Arc<dyn ExternalJobRunner>,
    ) -> Result<Self> {
        config.validate()?;

        let id = Uuid::new_v4();
        let pools = ExecutionPools::from_config(&config.execution);
        let publisher = ResultPublisher::new(queues.results.clone(), config.artifacts.retention);
        let factory = ChainFactory::new(
            pools.clone(),
            runner.clone(),
            publisher,
            ArtifactAllocator::from_config(&config.artifacts),
            DelayPolicy::new(config.jobs.time_unit()),
        );
        let dispatcher = Dispatcher::new(queues.requests.clone(), TaskRegistry::new(), factory);

        info!(
            "🚀 SERVER: Method server {} ready (profile={:?}, runner={}, {}={} workers, {}={} workers)",
            id,
            config.execution.profile,
            runner.name(),
            pools.external.label(),
            pools.external.max_workers(),
            pools.local.label(),
            pools.local.max_workers()
        );

        Ok(Self {
            id,
            config: config.clone(),
            queues,
            pools,
            dispatcher,
        })
    }

    /// Connect to the configured Redis broker and build the configured runner
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let queues = MethodServerQueues::connect_redis(&config.queues).await?;
        Self::new(config, queues, runner_from_config(&config.jobs))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn queues(&self) -> &MethodServerQueues {
        &self.queues
    }

    pub fn pools(&self) -> &ExecutionPools {
        &self.pools
    }

    pub fn registry(&self) -> &TaskRegistry {
        self.dispatcher.registry()
    }

    /// Listen until the shutdown sentinel, then drain every chain
    pub async fn run(&self) -> DrainReport {
        info!("👂 SERVER: {} listening on {}", self.id, self.queues.requests.name());

        let dispatcher = self.dispatcher.clone();
        let listener = self
            .pools
            .local
            .spawn_dependent(async move { dispatcher.run().await });

        let report = drain(listener, self.registry(), &self.pools).await;
        info!("🛑 SERVER: {} stopped: {}", self.id, report.tally());
        report
    }
}
