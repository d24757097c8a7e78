//! Drives one optimization run through an engine session.

use pso_types::{ParameterBounds, PsoResult};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::reader::{ReadOutcome, ResultReader};
use crate::session::{EngineBackend, Session};

/// An in-flight optimization run. Dropping it releases the engine session.
#[derive(Debug)]
pub struct RunHandle {
    session: Session,
    started: Instant,
    custom_bounds: bool,
}

/// How a completed run went.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionStatus {
    pub elapsed: Duration,
    pub custom_bounds: bool,
    /// Text the engine printed while running.
    pub engine_output: String,
}

impl RunHandle {
    /// Block until the engine reports completion, then release the session.
    pub fn await_completion(mut self) -> PsoResult<CompletionStatus> {
        let engine_output = self.session.wait()?;
        let elapsed = self.started.elapsed();
        info!("Engine run completed in {:.1}s", elapsed.as_secs_f64());
        Ok(CompletionStatus {
            elapsed,
            custom_bounds: self.custom_bounds,
            engine_output,
        })
    }
}

/// Starts optimization runs, one fresh engine session each.
pub struct OptimizerInvoker<B> {
    backend: B,
}

impl<B: EngineBackend> OptimizerInvoker<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Open a session and trigger the optimization entry point. `None` runs
    /// with the engine's default bounds.
    pub fn run(&self, bounds: Option<&ParameterBounds>) -> PsoResult<RunHandle> {
        let mut session = Session::acquire(&self.backend)?;
        match bounds {
            Some(b) => info!("Submitting optimization with custom bounds {}", b.to_matrix_literal()),
            None => info!("Submitting optimization with engine default bounds"),
        }
        session.submit(bounds)?;

        Ok(RunHandle {
            session,
            started: Instant::now(),
            custom_bounds: bounds.is_some(),
        })
    }
}

/// Everything a runner needs to report back.
#[derive(Debug)]
pub struct PipelineOutput {
    pub completion: CompletionStatus,
    pub read: ReadOutcome,
}

/// Run the engine to completion and read its artifacts from `artifact_dir`.
///
/// Artifacts from a previous run are removed first, so only files this run
/// wrote are reported.
pub fn run_pipeline<B: EngineBackend>(
    invoker: &OptimizerInvoker<B>,
    bounds: Option<&ParameterBounds>,
    artifact_dir: impl Into<PathBuf>,
) -> PsoResult<PipelineOutput> {
    let reader = ResultReader::new(artifact_dir);
    reader.clear_artifacts()?;

    let completion = invoker.run(bounds)?.await_completion()?;
    debug!("Artifacts present: {:?}", reader.present_artifacts());
    let read = reader.read_results();
    Ok(PipelineOutput { completion, read })
}
