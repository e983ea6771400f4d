//! dagcalc CLI: evaluate expressions through the task engine

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use dagcalc::{Agent, Orchestrator, Settings, SettingsBuilder};

#[derive(Parser)]
#[command(name = "dagcalc")]
#[command(about = "Evaluate arithmetic expressions as a DAG of simulated remote tasks")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// YAML settings file. Environment variables are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of workers (overrides COMPUTING_POWER)
    #[arg(long)]
    workers: Option<usize>,

    /// Do not wait the simulated operation cost
    #[arg(long)]
    no_latency: bool,

    /// Give up after this many seconds
    #[arg(long, default_value = "300")]
    timeout_secs: u64,

    /// Expressions to evaluate
    #[arg(required = true)]
    expressions: Vec<String>,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let base = match &cli.config {
        Some(path) => Settings::from_yaml_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::from_env(),
    };

    let mut builder = SettingsBuilder::from_settings(base);
    if let Some(workers) = cli.workers {
        builder = builder.computing_power(workers);
    }
    if cli.no_latency {
        builder = builder.simulate_latency(false);
    }
    builder.build().context("invalid settings")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .init();

    let settings = load_settings(&cli)?;
    let orchestrator = Arc::new(Orchestrator::new(&settings));

    let mut accepted = 0;
    for text in &cli.expressions {
        match orchestrator.submit_expression(text).await {
            Ok(id) => {
                info!(expression_id = %id, expression = %text, "Expression accepted");
                accepted += 1;
            }
            Err(e) => warn!(expression = %text, error = %e, "Expression rejected"),
        }
    }
    if accepted == 0 {
        bail!("no valid expressions to evaluate");
    }

    let agent = Agent::new(orchestrator.clone(), &settings).start();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(cli.timeout_secs);
    while !orchestrator.stats().await.is_idle() {
        if tokio::time::Instant::now() >= deadline {
            agent.shutdown().await;
            bail!("timed out after {}s waiting for results", cli.timeout_secs);
        }
        tokio::time::sleep(settings.poll_interval()).await;
    }

    let report = agent.shutdown().await;
    info!(?report, "All expressions evaluated");

    let expressions = orchestrator.list_expressions().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "expressions": expressions }))?
    );
    Ok(())
}
