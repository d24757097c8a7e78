//! Tool adapter configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where the runner lives and how it is run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Path to the `pso-runner` executable.
    pub script_path: PathBuf,

    /// Current working directory for every spawned runner. Engine artifacts
    /// are written here.
    pub working_directory: PathBuf,

    /// Upper bound on a single run. `None` waits for the runner however long
    /// it takes.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            script_path: PathBuf::from("./pso-runner"),
            working_directory: PathBuf::from("."),
            timeout_secs: None,
        }
    }
}

impl ToolConfig {
    pub fn new(script_path: impl Into<PathBuf>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
            working_directory: working_directory.into(),
            timeout_secs: None,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
