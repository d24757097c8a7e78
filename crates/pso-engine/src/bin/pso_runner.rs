// Isolated optimization runner.
//
// Stdout carries progress text followed by a single trailing
// `RESULT_JSON: {...}` line. Logs and failures go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pso_engine::command::ensure_working_directory;
use pso_engine::{run_pipeline, CommandEngine, EngineConfig, InvocationStyle, OptimizerInvoker};
use pso_types::{DesignVariable, OptimizationResult, ParameterBounds};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pso-runner", about = "Run one PSO optimization and print its result")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the optimizer once.
    Run(RunArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Bounds as JSON, e.g. '[[40,80],[15,35],[1.5,2.2],[4,6]]'. Omit for engine defaults.
    #[arg(long)]
    bounds: Option<String>,

    /// Engine executable.
    #[arg(long, env = "PSO_ENGINE", default_value = pso_engine::DEFAULT_ENGINE)]
    engine: String,

    /// Optimization entry point inside the engine.
    #[arg(long, env = "PSO_ENTRY_POINT", default_value = pso_engine::DEFAULT_ENTRY_POINT)]
    entry_point: String,

    #[arg(long, env = "PSO_ENGINE_STYLE", value_enum, default_value_t = InvocationStyle::Matlab)]
    engine_style: InvocationStyle,

    /// Directory the engine runs in and writes artifacts to.
    #[arg(long, default_value = ".")]
    workdir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            eprintln!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: RunArgs) -> anyhow::Result<()> {
    let bounds = args
        .bounds
        .as_deref()
        .map(|raw| serde_json::from_str::<ParameterBounds>(raw))
        .transpose()
        .context("invalid --bounds")?;

    ensure_working_directory(&args.workdir)?;

    match &bounds {
        Some(b) => {
            println!("Starting PSO optimization (custom parameters)...");
            println!("Parameter ranges:\n{b}");
        }
        None => println!("Starting PSO optimization (default parameters)..."),
    }

    let engine = CommandEngine::new(EngineConfig {
        executable: args.engine,
        entry_point: args.entry_point,
        style: args.engine_style,
        working_directory: args.workdir.clone(),
    });
    let invoker = OptimizerInvoker::new(engine);

    let output = run_pipeline(&invoker, bounds.as_ref(), &args.workdir)?;

    let engine_output = output.completion.engine_output.trim_end();
    if !engine_output.is_empty() {
        println!("{engine_output}");
    }
    for issue in &output.read.issues {
        eprintln!("WARNING: {issue}");
    }

    println!("\nOptimization finished.");
    print_summary(&output.read.result);
    info!(
        complete = output.read.result.is_complete(),
        "Runner finished in {:.1}s",
        output.completion.elapsed.as_secs_f64()
    );

    println!("{}", output.read.result.to_sentinel_line()?);
    Ok(())
}

fn print_summary(result: &OptimizationResult) {
    println!("==== PSO best solution ====");
    if let Some(normalized) = result.normalized_params {
        println!("Normalized parameters: {normalized:?}");
    }
    if result.physical_params.is_some() {
        let parts: Vec<String> = DesignVariable::ALL
            .iter()
            .filter_map(|v| {
                result
                    .physical(*v)
                    .map(|value| format!("{}: {:.2} {}", v.label(), value, v.unit()))
            })
            .collect();
        println!("Physical parameters: {}", parts.join(", ").trim_end());
    }
    if let (Some(accel), Some(fuel)) = (result.acceleration_time_s, result.fuel_consumption) {
        println!("Acceleration time: {accel:.2} s, fuel consumption: {fuel:.2} g/100km");
    }
    if let Some(objective) = result.final_objective {
        println!("Weighted objective: {objective:.4}");
    }
}
