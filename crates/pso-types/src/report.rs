//! Invocation reports returned by the tool adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::result::OptimizationResult;

/// Unique id for a single tool invocation.
pub type InvocationId = Uuid;

/// Whether the caller's bounds are forwarded to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    /// Let the engine apply its built-in bounds.
    #[default]
    Default,
    /// Forward the caller-supplied bounds.
    Custom,
}

impl OptimizationMode {
    pub fn description(self) -> &'static str {
        match self {
            Self::Default => "default parameters",
            Self::Custom => "custom parameters",
        }
    }
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Where in the invocation a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Validation,
    ProcessSpawn,
    Execution,
    Parsing,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::ProcessSpawn => "process_spawn",
            Self::Execution => "execution",
            Self::Parsing => "parsing",
        };
        f.write_str(name)
    }
}

/// Bookkeeping shared by every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationMeta {
    pub invocation_id: InvocationId,
    pub mode: OptimizationMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl InvocationMeta {
    pub fn start(mode: OptimizationMode) -> Self {
        let now = Utc::now();
        Self {
            invocation_id: Uuid::new_v4(),
            mode,
            started_at: now,
            finished_at: now,
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }
}

/// Outcome of one tool invocation. Always returned as data, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationReport {
    Success {
        meta: InvocationMeta,
        /// Parsed payload, absent when the sentinel line was missing or malformed.
        result: Option<OptimizationResult>,
        raw_output: String,
        payload_warning: Option<String>,
    },
    Failure {
        meta: InvocationMeta,
        stage: FailureStage,
        exit_code: Option<i32>,
        message: String,
        stdout: String,
        stderr: String,
        remediation: Vec<String>,
    },
}

impl InvocationReport {
    pub fn meta(&self) -> &InvocationMeta {
        match self {
            Self::Success { meta, .. } | Self::Failure { meta, .. } => meta,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn result(&self) -> Option<&OptimizationResult> {
        match self {
            Self::Success { result, .. } => result.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            Self::Failure { stage, .. } => Some(*stage),
            Self::Success { .. } => None,
        }
    }
}
