//! Tool abstraction exposed to agents and remote callers.

use async_trait::async_trait;
use pso_types::{DesignVariable, FailureStage, InvocationMeta, OptimizationMode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapter::{failure, ToolAdapter};
use crate::launcher::ProcessLauncher;
use crate::render::render_report;

/// What a tool call hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Option<Value>,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
            is_error: true,
        }
    }
}

/// A callable tool with a JSON Schema for its arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_schema(&self) -> Value;

    /// Execute the tool. Problems are reported through `is_error`, never as
    /// a Rust error.
    async fn call(&self, arguments: Value) -> ToolOutput;
}

/// Arguments of `run_optimization`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunOptimizationArgs {
    pub optimization_mode: OptimizationMode,
    pub motor_power_range: Vec<f64>,
    pub battery_capacity_range: Vec<f64>,
    pub engine_displacement_range: Vec<f64>,
    pub gear_count_range: Vec<f64>,
}

impl Default for RunOptimizationArgs {
    fn default() -> Self {
        let range = |v: DesignVariable| {
            let r = v.default_range();
            vec![r.min, r.max]
        };
        Self {
            optimization_mode: OptimizationMode::Default,
            motor_power_range: range(DesignVariable::MotorPower),
            battery_capacity_range: range(DesignVariable::BatteryCapacity),
            engine_displacement_range: range(DesignVariable::EngineDisplacement),
            gear_count_range: range(DesignVariable::GearCount),
        }
    }
}

impl RunOptimizationArgs {
    /// Ranges in design-variable order.
    pub fn pairs(&self) -> Vec<Vec<f64>> {
        vec![
            self.motor_power_range.clone(),
            self.battery_capacity_range.clone(),
            self.engine_displacement_range.clone(),
            self.gear_count_range.clone(),
        ]
    }
}

/// `run_optimization`: hybrid-vehicle PSO optimization in an isolated runner.
pub struct RunOptimizationTool<L> {
    adapter: ToolAdapter<L>,
}

impl<L: ProcessLauncher> RunOptimizationTool<L> {
    pub const NAME: &'static str = "run_optimization";

    pub fn new(adapter: ToolAdapter<L>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl<L: ProcessLauncher> Tool for RunOptimizationTool<L> {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Optimize hybrid-vehicle design parameters (motor power, battery capacity, \
         engine displacement, gear count) with particle swarm optimization"
    }

    fn input_schema(&self) -> Value {
        let range = |description: &str, v: DesignVariable| {
            let r = v.default_range();
            json!({
                "type": "array",
                "items": { "type": "number" },
                "minItems": 2,
                "maxItems": 2,
                "default": [r.min, r.max],
                "description": description,
            })
        };
        json!({
            "type": "object",
            "properties": {
                "optimization_mode": {
                    "type": "string",
                    "enum": ["default", "custom"],
                    "default": "default",
                    "description": "'default' uses the engine's bounds, 'custom' uses the ranges below",
                },
                "motor_power_range": range("Motor power range [min, max] (kW)", DesignVariable::MotorPower),
                "battery_capacity_range": range("Battery capacity range [min, max] (kWh)", DesignVariable::BatteryCapacity),
                "engine_displacement_range": range("Engine displacement range [min, max] (L)", DesignVariable::EngineDisplacement),
                "gear_count_range": range("Gear count range [min, max]", DesignVariable::GearCount),
            },
            "additionalProperties": false,
        })
    }

    async fn call(&self, arguments: Value) -> ToolOutput {
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };

        let report = match serde_json::from_value::<RunOptimizationArgs>(arguments) {
            Ok(args) => {
                self.adapter
                    .invoke(args.optimization_mode, Some(args.pairs().as_slice()))
                    .await
            }
            Err(e) => failure(
                InvocationMeta::start(OptimizationMode::Default),
                FailureStage::Parsing,
                format!("invalid arguments: {e}"),
                Vec::new(),
            ),
        };

        ToolOutput {
            text: render_report(&report),
            structured: serde_json::to_value(&report).ok(),
            is_error: !report.is_success(),
        }
    }
}

/// Tools by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Descriptors for every registered tool.
    pub fn list(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect()
    }

    pub async fn call(&self, name: &str, arguments: Value) -> ToolOutput {
        match self.get(name) {
            Some(tool) => tool.call(arguments).await,
            None => ToolOutput::error(format!("unknown tool: {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolConfig;
    use crate::launcher::{CapturedOutput, LaunchError, RunnerCommand};
    use std::time::Duration;

    struct EchoLauncher;

    #[async_trait]
    impl ProcessLauncher for EchoLauncher {
        async fn launch(
            &self,
            command: &RunnerCommand,
            _timeout: Option<Duration>,
        ) -> Result<CapturedOutput, LaunchError> {
            Ok(CapturedOutput {
                exit_code: Some(0),
                stdout: format!(
                    "args: {}\nRESULT_JSON: {{\"best_physical_params\": [60, 25, 1.85, 5]}}\n",
                    command.args.join(" ")
                ),
                stderr: String::new(),
            })
        }
    }

    fn tool(dir: &std::path::Path) -> RunOptimizationTool<EchoLauncher> {
        let script = dir.join("pso-runner");
        std::fs::write(&script, "").unwrap();
        RunOptimizationTool::new(ToolAdapter::with_launcher(
            ToolConfig::new(script, dir),
            EchoLauncher,
        ))
    }

    #[test]
    fn args_default_to_standard_ranges() {
        let args: RunOptimizationArgs = serde_json::from_value(json!({})).unwrap();
        assert_eq!(args, RunOptimizationArgs::default());
        assert_eq!(
            args.pairs(),
            vec![vec![40.0, 80.0], vec![15.0, 35.0], vec![1.5, 2.2], vec![4.0, 6.0]]
        );
    }

    #[tokio::test]
    async fn custom_call_renders_summary() {
        let dir = tempfile::tempdir().unwrap();
        let output = tool(dir.path())
            .call(json!({
                "optimization_mode": "custom",
                "motor_power_range": [40, 80],
                "battery_capacity_range": [15, 35],
                "engine_displacement_range": [1.5, 2.2],
                "gear_count_range": [4, 6],
            }))
            .await;

        assert!(!output.is_error);
        assert!(output.text.contains("Motor power: 60.00 kW"));
        assert!(output.text.contains("--bounds [[40.0,80.0],[15.0,35.0],[1.5,2.2],[4.0,6.0]]"));
        let structured = output.structured.unwrap();
        assert_eq!(structured["status"], "success");
        assert_eq!(structured["result"]["best_physical_params"][2], 1.85);
    }

    #[tokio::test]
    async fn null_arguments_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let output = tool(dir.path()).call(Value::Null).await;
        assert!(!output.is_error);
        assert!(output.text.contains("default parameters"));
    }

    #[tokio::test]
    async fn undecodable_arguments_are_parsing_failures() {
        let dir = tempfile::tempdir().unwrap();
        let output = tool(dir.path())
            .call(json!({"optimization_mode": "aggressive"}))
            .await;

        assert!(output.is_error);
        assert_eq!(output.structured.unwrap()["stage"], "parsing");
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(tool(dir.path())));

        let listed = registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["name"], "run_optimization");
        assert_eq!(
            listed[0]["inputSchema"]["properties"]["gear_count_range"]["default"],
            json!([4.0, 6.0])
        );

        let output = registry.call("run_optimization", json!({})).await;
        assert!(!output.is_error);

        let output = registry.call("does_not_exist", json!({})).await;
        assert!(output.is_error);
        assert!(output.text.contains("unknown tool"));
    }
}
