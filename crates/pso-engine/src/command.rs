//! Engine backend that drives the optimizer through an external executable.

use pso_types::{ParameterBounds, PsoError, PsoResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use tracing::{debug, info, warn};

use crate::session::{EngineBackend, EngineSession};

/// Default engine executable.
pub const DEFAULT_ENGINE: &str = "matlab";

/// Default optimization entry point inside the engine.
pub const DEFAULT_ENTRY_POINT: &str = "pso_optimization_full";

/// How the entry point and bounds are handed to the engine executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStyle {
    /// `matlab -batch "entry_point([..])"`
    #[default]
    Matlab,
    /// `<engine> <entry_point> [<matrix>]`
    Argv,
}

/// Settings for [`CommandEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub executable: String,
    pub entry_point: String,
    pub style: InvocationStyle,
    /// Directory the engine runs in and writes its artifacts to.
    pub working_directory: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_ENGINE.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            style: InvocationStyle::default(),
            working_directory: PathBuf::from("."),
        }
    }
}

impl EngineConfig {
    /// Arguments for one run of the entry point.
    pub fn arguments(&self, bounds: Option<&ParameterBounds>) -> Vec<String> {
        let matrix = bounds.map(ParameterBounds::to_matrix_literal);
        match self.style {
            InvocationStyle::Matlab => {
                let call = match matrix {
                    Some(m) => format!("{}({})", self.entry_point, m),
                    None => self.entry_point.clone(),
                };
                vec!["-batch".to_string(), call]
            }
            InvocationStyle::Argv => {
                let mut args = vec![self.entry_point.clone()];
                args.extend(matrix);
                args
            }
        }
    }
}

/// Runs the engine as a blocking child process, one process per session.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    config: EngineConfig,
}

impl CommandEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn resolve_executable(&self) -> PsoResult<PathBuf> {
        which::which_in(
            &self.config.executable,
            std::env::var_os("PATH"),
            &self.config.working_directory,
        )
        .map_err(|e| {
            PsoError::engine(format!(
                "engine executable '{}' is not installed or not on PATH: {}",
                self.config.executable, e
            ))
        })
    }
}

impl EngineBackend for CommandEngine {
    fn name(&self) -> &str {
        &self.config.executable
    }

    fn start_session(&self) -> PsoResult<Box<dyn EngineSession>> {
        let executable = self.resolve_executable()?;
        info!("Starting engine session with {}", executable.display());
        Ok(Box::new(CommandSession {
            executable,
            config: self.config.clone(),
            child: None,
        }))
    }
}

struct CommandSession {
    executable: PathBuf,
    config: EngineConfig,
    child: Option<Child>,
}

impl EngineSession for CommandSession {
    fn submit(&mut self, bounds: Option<&ParameterBounds>) -> PsoResult<()> {
        if self.child.is_some() {
            return Err(PsoError::engine("a run is already in progress in this session"));
        }

        let args = self.config.arguments(bounds);
        debug!("Engine command: {} {:?}", self.executable.display(), args);

        let child = Command::new(&self.executable)
            .args(&args)
            .current_dir(&self.config.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PsoError::engine(format!(
                    "failed to launch {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        self.child = Some(child);
        Ok(())
    }

    fn wait(&mut self) -> PsoResult<String> {
        let child = self
            .child
            .take()
            .ok_or_else(|| PsoError::engine("no run was submitted"))?;

        let output = child.wait_with_output()?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if output.status.success() {
            Ok(stdout)
        } else {
            Err(PsoError::engine(engine_diagnostic(&output)))
        }
    }

    fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!("Engine session closed with a run still in progress; killing it");
            if let Err(e) = child.kill() {
                warn!("Failed to kill engine process: {}", e);
            }
            let _ = child.wait();
        }
    }
}

/// Best available explanation of a failed engine run.
fn engine_diagnostic(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return stdout.trim().to_string();
    }
    match output.status.code() {
        Some(code) => format!("engine exited with status {code}"),
        None => "engine terminated by signal".to_string(),
    }
}

/// Working directory check used by callers before starting an engine.
pub fn ensure_working_directory(path: &Path) -> PsoResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(pso_types::config_error!(
            "working directory {} does not exist",
            path.display()
        ))
    }
}
