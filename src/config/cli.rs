//! Command-line overrides shared by the method server and its client tools.
//!
//! Flags are the last configuration layer: they win over the YAML file and
//! `METHOD_SERVER_*` environment variables, but only when given.

use clap::Args;
use std::path::PathBuf;

use super::{ExecutionProfile, QueueConfig, ServerConfig};

/// Where the broker lives
#[derive(Debug, Clone, Default, Args)]
pub struct BrokerArgs {
    /// Address at which the redis server can be reached
    #[arg(long = "redishost")]
    pub redis_host: Option<String>,

    /// Port on which redis is available
    #[arg(long = "redisport")]
    pub redis_port: Option<u16>,

    /// Queue name prefix (`<prefix>_inputs`, `<prefix>_results`)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Configuration file (defaults to config/method-server.yaml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl BrokerArgs {
    pub fn apply(&self, queues: &mut QueueConfig) {
        if let Some(host) = &self.redis_host {
            queues.host = host.clone();
        }
        if let Some(port) = self.redis_port {
            queues.port = port;
        }
        if let Some(prefix) = &self.prefix {
            queues.prefix = prefix.clone();
        }
    }
}

/// Server-only switches
#[derive(Debug, Clone, Default, Args)]
pub struct ServerArgs {
    #[command(flatten)]
    pub broker: BrokerArgs,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Run external jobs on a local thread pool instead of the bounded pool
    #[arg(short, long)]
    pub mac: bool,
}

impl ServerArgs {
    pub fn apply(&self, config: &mut ServerConfig) {
        self.broker.apply(&mut config.queues);
        if self.mac {
            config.execution.profile = ExecutionProfile::Threads;
        }
    }
}
