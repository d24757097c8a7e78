//! Runs one optimization per call in an isolated runner process and turns
//! whatever happened into an [`InvocationReport`].

use pso_types::{
    make_bounds, FailureStage, InvocationMeta, InvocationReport, OptimizationMode,
    OptimizationResult, ParameterBounds, PsoError, RESULT_SENTINEL,
};
use std::fmt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::ToolConfig;
use crate::launcher::{CapturedOutput, LaunchError, ProcessLauncher, RunnerCommand, TokioLauncher};

/// Checklist attached to failures of the adapter itself.
pub const REMEDIATION_CHECKLIST: [&str; 3] = [
    "Is the runner executable present at the configured script_path?",
    "Is the optimization engine installed and reachable on PATH?",
    "Does the working directory exist and is it writable?",
];

/// Progress of a single invocation, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvocationPhase {
    Validating,
    Spawned,
    Classifying,
}

impl fmt::Display for InvocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validating => "validating",
            Self::Spawned => "spawned",
            Self::Classifying => "classifying",
        };
        f.write_str(name)
    }
}

/// Result of scanning captured stdout for the sentinel payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadExtraction {
    Parsed(OptimizationResult),
    Missing,
    Invalid(String),
}

/// Locate the last `RESULT_JSON:` line in `stdout` and decode its payload.
pub fn extract_payload(stdout: &str) -> PayloadExtraction {
    let Some(json) = stdout
        .lines()
        .rev()
        .find_map(|line| line.trim_start().strip_prefix(RESULT_SENTINEL))
    else {
        return PayloadExtraction::Missing;
    };

    match serde_json::from_str::<OptimizationResult>(json.trim()) {
        Ok(result) => PayloadExtraction::Parsed(result),
        Err(e) => PayloadExtraction::Invalid(PsoError::PayloadParse(e.to_string()).to_string()),
    }
}

/// The externally callable optimization operation.
///
/// Holds no per-call state; concurrent `invoke` calls each get their own
/// runner process.
pub struct ToolAdapter<L = TokioLauncher> {
    config: ToolConfig,
    launcher: L,
}

impl ToolAdapter<TokioLauncher> {
    pub fn new(config: ToolConfig) -> Self {
        Self::with_launcher(config, TokioLauncher)
    }
}

impl<L: ProcessLauncher> ToolAdapter<L> {
    pub fn with_launcher(config: ToolConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run one optimization. In `Custom` mode `bounds` defaults to the
    /// standard ranges when absent; in `Default` mode it is ignored and the
    /// engine applies its own bounds. Never fails: every problem is reported
    /// as [`InvocationReport::Failure`].
    pub async fn invoke(
        &self,
        mode: OptimizationMode,
        bounds: Option<&[Vec<f64>]>,
    ) -> InvocationReport {
        let meta = InvocationMeta::start(mode);
        let span = info_span!("invocation", id = %meta.invocation_id, %mode);
        let report = self.invoke_inner(meta, bounds).instrument(span).await;

        match &report {
            InvocationReport::Success { result, .. } => {
                info!(
                    id = %report.meta().invocation_id,
                    parsed = result.is_some(),
                    "Optimization invocation succeeded"
                );
            }
            InvocationReport::Failure { stage, message, .. } => {
                error!(id = %report.meta().invocation_id, %stage, "Optimization invocation failed: {}", message);
            }
        }
        report
    }

    async fn invoke_inner(
        &self,
        meta: InvocationMeta,
        bounds: Option<&[Vec<f64>]>,
    ) -> InvocationReport {
        debug!(phase = %InvocationPhase::Validating);
        let command = match self.prepare(meta.mode, bounds).await {
            Ok(command) => command,
            Err(e) if e.is_validation() => {
                return failure(meta, FailureStage::Validation, e.to_string(), Vec::new());
            }
            Err(e) => {
                return failure(meta, FailureStage::ProcessSpawn, e.to_string(), checklist());
            }
        };

        debug!(phase = %InvocationPhase::Spawned, program = %command.program.display());
        let launched = self.launcher.launch(&command, self.config.timeout()).await;

        debug!(phase = %InvocationPhase::Classifying);
        match launched {
            Ok(output) => classify(meta, output),
            Err(e @ LaunchError::Spawn { .. }) => {
                failure(meta, FailureStage::ProcessSpawn, e.to_string(), checklist())
            }
            Err(e) => failure(meta, FailureStage::Execution, e.to_string(), checklist()),
        }
    }

    async fn prepare(
        &self,
        mode: OptimizationMode,
        bounds: Option<&[Vec<f64>]>,
    ) -> Result<RunnerCommand, PsoError> {
        let script = &self.config.script_path;
        if !tokio::fs::try_exists(script).await.unwrap_or(false) {
            return Err(PsoError::Precondition(format!(
                "runner not found: {}",
                script.display()
            )));
        }
        if !tokio::fs::metadata(&self.config.working_directory)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(PsoError::Precondition(format!(
                "working directory not found: {}",
                self.config.working_directory.display()
            )));
        }

        let mut args = vec!["run".to_string()];
        if let Some(bounds) = effective_bounds(mode, bounds)? {
            info!("Custom parameter ranges:\n{}", bounds);
            args.push("--bounds".to_string());
            args.push(bounds.to_json()?);
        }

        Ok(RunnerCommand {
            program: script.clone(),
            args,
            cwd: self.config.working_directory.clone(),
        })
    }
}

/// Turn a finished runner process into a report.
pub fn classify(meta: InvocationMeta, output: CapturedOutput) -> InvocationReport {
    if !output.success() {
        let error = PsoError::Process {
            exit_code: output.exit_code,
            message: match output.exit_code {
                Some(code) => format!("runner exited with code {code}"),
                None => "runner was terminated by a signal".to_string(),
            },
        };
        return InvocationReport::Failure {
            meta: meta.finish(),
            stage: FailureStage::Execution,
            exit_code: output.exit_code,
            message: error.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
            remediation: Vec::new(),
        };
    }

    let (result, payload_warning) = match extract_payload(&output.stdout) {
        PayloadExtraction::Parsed(result) => (Some(result), None),
        PayloadExtraction::Missing => {
            warn!("Runner succeeded without a {} line", RESULT_SENTINEL);
            (None, Some(format!("no {RESULT_SENTINEL} line in runner output")))
        }
        PayloadExtraction::Invalid(message) => {
            warn!("Could not decode result payload: {}", message);
            (None, Some(message))
        }
    };

    InvocationReport::Success {
        meta: meta.finish(),
        result,
        raw_output: output.stdout,
        payload_warning,
    }
}

/// Failure that happened before or around the runner, with no captured output.
pub fn failure(
    meta: InvocationMeta,
    stage: FailureStage,
    message: String,
    remediation: Vec<String>,
) -> InvocationReport {
    InvocationReport::Failure {
        meta: meta.finish(),
        stage,
        exit_code: None,
        message,
        stdout: String::new(),
        stderr: String::new(),
        remediation,
    }
}

fn checklist() -> Vec<String> {
    REMEDIATION_CHECKLIST.iter().map(|s| s.to_string()).collect()
}

/// Bounds actually sent to the runner for a request, if any.
pub fn effective_bounds(
    mode: OptimizationMode,
    bounds: Option<&[Vec<f64>]>,
) -> Result<Option<ParameterBounds>, PsoError> {
    match mode {
        OptimizationMode::Default => Ok(None),
        OptimizationMode::Custom => Ok(Some(make_bounds(bounds)?.unwrap_or_default())),
    }
}
