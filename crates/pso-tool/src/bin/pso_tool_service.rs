use clap::Parser;
use pso_tool::{serve, RunOptimizationTool, ToolAdapter, ToolConfig, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serve the `run_optimization` tool over line-delimited JSON on stdio.
#[derive(Debug, Parser)]
#[command(name = "pso-tool-service")]
struct Args {
    /// Path to the pso-runner executable.
    #[arg(long, env = "PSO_RUNNER", default_value = "./pso-runner")]
    runner: PathBuf,

    /// Working directory for spawned runners.
    #[arg(long, env = "PSO_WORKDIR", default_value = ".")]
    workdir: PathBuf,

    /// Kill a run that takes longer than this many seconds.
    #[arg(long, env = "PSO_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ToolConfig {
        script_path: args.runner,
        working_directory: args.workdir,
        timeout_secs: args.timeout_secs,
    };

    if !config.script_path.exists() {
        warn!(
            "Runner not found at {}; calls will fail until it is installed",
            config.script_path.display()
        );
    }

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(RunOptimizationTool::new(ToolAdapter::new(config.clone()))));

    info!(
        runner = %config.script_path.display(),
        workdir = %config.working_directory.display(),
        timeout_secs = ?config.timeout_secs,
        "PSO tool service listening on stdio"
    );

    serve(
        Arc::new(registry),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    Ok(())
}
