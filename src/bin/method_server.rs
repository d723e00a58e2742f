//! Method Server Binary
//!
//! Listens on `<prefix>_inputs`, runs one simulated job per parameter and
//! publishes `(parameter, value)` pairs on `<prefix>_results` until a `null`
//! arrives on the input queue.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use method_server::config::{ConfigManager, ServerArgs};
use method_server::constants::{exit_codes, BANNER};
use method_server::logging::init_structured_logging;
use method_server::orchestration::{DrainReport, MethodServer};

#[derive(Debug, Parser)]
#[command(name = "method-server", author, version, about)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
}

fn exit_code(report: &DrainReport) -> i32 {
    if report.listener_error.is_some() {
        exit_codes::LISTENER_FAILED
    } else if report.integrity_violations() > 0 {
        exit_codes::DRAIN_INTEGRITY
    } else {
        exit_codes::SUCCESS
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_structured_logging(cli.server.debug);

    let mut manager = match &cli.server.broker.config {
        Some(path) => ConfigManager::load_from_file(path),
        None => ConfigManager::load(),
    }
    .context("failed to load configuration")?;
    cli.server.apply(manager.config_mut());
    manager
        .revalidate()
        .context("invalid command line overrides")?;

    println!("{BANNER}");

    let config = manager.config();
    info!(
        "🚀 Starting method server against {}:{} (environment: {})",
        config.queues.host,
        config.queues.port,
        manager.environment()
    );
    let server = MethodServer::connect(config)
        .await
        .with_context(|| format!("cannot reach broker at {}:{}", config.queues.host, config.queues.port))?;

    let report = server.run().await;

    for pair in report.successes() {
        println!("{pair}");
    }
    for (parameter, failure) in report.failures() {
        eprintln!("{parameter}: {failure}");
    }
    println!("{}", report.tally());

    let code = exit_code(&report);
    if code != exit_codes::SUCCESS {
        if let Some(listener_error) = &report.listener_error {
            error!("❌ Listener stopped early: {}", listener_error);
        }
        std::process::exit(code);
    }
    Ok(())
}
