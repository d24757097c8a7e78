//! Human-readable rendering of invocation reports.

use pso_types::{DesignVariable, InvocationReport, OptimizationResult};
use std::fmt::Write;

/// Summary lines for a parsed result, one per populated field.
pub fn summary_lines(result: &OptimizationResult) -> Vec<String> {
    let mut lines = Vec::new();

    if result.physical_params.is_some() {
        for variable in DesignVariable::ALL {
            let Some(value) = result.physical(variable) else {
                continue;
            };
            let line = match variable {
                DesignVariable::GearCount => format!("{}: {:.0}", variable.label(), value),
                _ => format!("{}: {:.2} {}", variable.label(), value, variable.unit()),
            };
            lines.push(line);
        }
    }
    if let Some(accel) = result.acceleration_time_s {
        lines.push(format!("Acceleration time: {accel:.2} s"));
    }
    if let Some(fuel) = result.fuel_consumption {
        lines.push(format!("Fuel consumption: {fuel:.2} g/100km"));
    }
    if let Some(objective) = result.final_objective {
        lines.push(format!("Objective: {objective:.4}"));
    }
    lines
}

/// Render a report as the text returned to tool callers.
pub fn render_report(report: &InvocationReport) -> String {
    let mut out = String::new();

    match report {
        InvocationReport::Success {
            result,
            raw_output,
            payload_warning,
            ..
        } => {
            out.push_str("PSO optimization completed successfully.\n");

            if let Some(result) = result {
                out.push_str("\n**Result summary**:\n");
                for line in summary_lines(result) {
                    let _ = writeln!(out, "  - {line}");
                }
            }
            if let Some(warning) = payload_warning {
                let _ = writeln!(out, "\nWarning: result parsing failed: {warning}");
            }

            out.push_str("\n**Detailed output**:\n");
            push_block(&mut out, raw_output);
        }
        InvocationReport::Failure {
            stage,
            exit_code,
            message,
            stdout,
            stderr,
            remediation,
            ..
        } => {
            match exit_code {
                Some(code) => {
                    let _ = writeln!(out, "PSO optimization failed (exit code: {code})");
                }
                None => {
                    let _ = writeln!(out, "PSO optimization failed during {stage}: {message}");
                }
            }

            if !stderr.trim().is_empty() {
                out.push_str("\n**Error output**:\n");
                push_block(&mut out, stderr);
            }
            if !stdout.trim().is_empty() {
                out.push_str("\n**Standard output**:\n");
                push_block(&mut out, stdout);
            }
            if !remediation.is_empty() {
                out.push_str("\nPlease check:\n");
                for (i, item) in remediation.iter().enumerate() {
                    let _ = writeln!(out, "{}. {}", i + 1, item);
                }
            }
        }
    }

    let _ = write!(
        out,
        "\n**Execution mode**: {}",
        report.meta().mode.description()
    );
    out
}

fn push_block(out: &mut String, text: &str) {
    let _ = writeln!(out, "```\n{}\n```", text.trim_end());
}
