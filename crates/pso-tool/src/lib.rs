//! # pso-tool
//!
//! Exposes PSO optimization as a request/response tool. Each call runs the
//! `pso-runner` binary in its own process, captures its output, and turns it
//! into an [`InvocationReport`](pso_types::InvocationReport): a rendered text
//! report for humans plus the structured payload.

pub mod adapter;
pub mod config;
pub mod launcher;
pub mod render;
pub mod service;
pub mod tool;

pub use adapter::{classify, extract_payload, PayloadExtraction, ToolAdapter, REMEDIATION_CHECKLIST};
pub use config::ToolConfig;
pub use launcher::{CapturedOutput, LaunchError, ProcessLauncher, RunnerCommand, TokioLauncher};
pub use render::{render_report, summary_lines};
pub use service::{handle_line, serve, Request, Response, RpcError};
pub use tool::{RunOptimizationArgs, RunOptimizationTool, Tool, ToolOutput, ToolRegistry};
