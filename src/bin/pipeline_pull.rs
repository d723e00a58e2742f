//! Pipeline Pull
//!
//! Client tool: take one `(parameter, value)` result off the method server's
//! output queue, blocking or with a timeout.

use anyhow::Context;
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use method_server::config::{BrokerArgs, ConfigManager};
use method_server::messaging::MethodServerQueues;

#[derive(Debug, Parser)]
#[command(name = "pipeline-pull", author, version, about)]
struct Cli {
    #[command(flatten)]
    broker: BrokerArgs,

    /// Give up after this many seconds (blocks forever when omitted)
    #[arg(short = 't', long = "timeout")]
    timeout: Option<u64>,
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

    let timeout = cli.timeout.map(Duration::from_secs);
    match queues
        .get_result(timeout)
        .await
        .context("failed to read result")?
    {
        Some(pair) => println!("{pair}"),
        None => {
            eprintln!("no result within {}s", cli.timeout.unwrap_or_default());
            std::process::exit(1);
        }
    }
    Ok(())
}
