//! Pipeline Pump
//!
//! Client tool: put a parameter (or the shutdown sentinel) on the method
//! server's input queue.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use method_server::config::{BrokerArgs, ConfigManager};
use method_server::messaging::{MethodServerQueues, Parameter};

#[derive(Debug, Parser)]
#[command(name = "pipeline-pump", author, version, about)]
#[command(group(ArgGroup::new("request").required(true).args(["param", "shutdown"])))]
struct Cli {
    #[command(flatten)]
    broker: BrokerArgs,

    /// Integer parameter to request a run for
    #[arg(short = 'p', long = "param", allow_negative_numbers = true)]
    param: Option<i64>,

    /// Send the shutdown sentinel instead
    #[arg(long)]
    shutdown: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut manager = match &cli.broker.config {
        Some(path) => ConfigManager::load_from_file(path),
        None => ConfigManager::load(),
    }
    .context("failed to load configuration")?;
    cli.broker.apply(&mut manager.config_mut().queues);

    let queues = MethodServerQueues::connect_redis(&manager.config().queues)
        .await
        .context("cannot reach broker")?;

    if let Some(value) = cli.param {
        queues
            .send_parameter(Parameter::new(value))
            .await
            .context("failed to enqueue parameter")?;
        println!("queued {value} on {}", queues.requests.name());
    }
    if cli.shutdown {
        queues
            .send_shutdown()
            .await
            .context("failed to enqueue shutdown")?;
        println!("queued shutdown on {}", queues.requests.name());
    }
    Ok(())
}
