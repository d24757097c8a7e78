//! Drives the `pso-runner` binary against a stub shell engine.
#![cfg(unix)]

use pso_types::{OptimizationResult, RESULT_SENTINEL};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};

const STUB_ENGINE: &str = r#"#!/bin/sh
# $1 = entry point, $2 = optional bounds matrix
if [ -n "$2" ]; then
  rows=$(echo "$2" | tr -d '\133\135' | tr ';' '\n')
else
  rows="40 80
15 35
1.5 2.2
4 6"
fi
phys=$(echo "$rows" | awk '{ printf "%s%g", (NR>1?",":""), ($1+$2)/2 }')
echo "0.5,0.5,0.5,0.5" > gbest_param.csv
echo "$phys" >> gbest_param.csv
echo "0.5,0.5,0.5,0.5,7.25,480.5" > Pareto_result.csv
printf '3.1\n2.4\n1.875\n' > gbest_hist.csv
echo "stub engine ran $1"
"#;

const PARAMS_ONLY_ENGINE: &str = "#!/bin/sh\nprintf '0.5,0.5,0.5,0.5\\n60,25,1.85,5\\n' > gbest_param.csv\n";

const BROKEN_ENGINE: &str = "#!/bin/sh\necho \"Undefined function '$1'\" >&2\nexit 2\n";

fn install(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn run_runner(workdir: &Path, engine: &str, bounds: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pso-runner"));
    cmd.arg("run")
        .args(["--engine", engine, "--engine-style", "argv"])
        .arg("--workdir")
        .arg(workdir)
        .current_dir(workdir)
        .env("RUST_LOG", "warn");
    if let Some(b) = bounds {
        cmd.args(["--bounds", b]);
    }
    cmd.output().unwrap()
}

fn sentinel_payload(stdout: &str) -> OptimizationResult {
    let last = stdout.lines().last().unwrap();
    let json = last.strip_prefix(RESULT_SENTINEL).expect("trailing sentinel line");
    serde_json::from_str(json.trim()).unwrap()
}

#[test]
fn default_mode_emits_trailing_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let engine = install(dir.path(), "engine.sh", STUB_ENGINE);

    let output = run_runner(dir.path(), &engine, None);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("default parameters"));
    assert!(stdout.contains("stub engine ran pso_optimization_full"));

    let result = sentinel_payload(&stdout);
    assert!(result.is_complete());
    assert_eq!(result.physical_params, Some([60.0, 25.0, 1.85, 5.0]));
    assert_eq!(result.final_objective, Some(1.875));
}

#[test]
fn custom_bounds_reach_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let engine = install(dir.path(), "engine.sh", STUB_ENGINE);

    let output = run_runner(dir.path(), &engine, Some("[[50,70],[20,30],[1.6,2.0],[5,5]]"));
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let result = sentinel_payload(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(result.physical_params, Some([60.0, 25.0, 1.8, 5.0]));
}

#[test]
fn engine_fault_exits_nonzero_without_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let engine = install(dir.path(), "engine.sh", BROKEN_ENGINE);

    let output = run_runner(dir.path(), &engine, None);
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stdout.contains(RESULT_SENTINEL));
    assert!(stderr.contains("ERROR: Engine error: Undefined function 'pso_optimization_full'"));
}

#[test]
fn invalid_bounds_fail_before_engine_starts() {
    let dir = tempfile::tempdir().unwrap();
    let engine = install(dir.path(), "engine.sh", STUB_ENGINE);

    let output = run_runner(dir.path(), &engine, Some("[[80,40],[15,35],[1.5,2.2],[4,6]]"));
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid --bounds"));
    assert!(!dir.path().join("gbest_param.csv").exists());
}

#[test]
fn missing_engine_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_runner(dir.path(), "no-such-engine-binary-91c2", None);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not installed"));
}

#[test]
fn leftover_artifacts_are_not_reported_as_results() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("gbest_hist.csv"), "9.99\n").unwrap();
    let engine = install(dir.path(), "engine.sh", PARAMS_ONLY_ENGINE);

    let output = run_runner(dir.path(), &engine, None);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let result = sentinel_payload(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(result.physical_params, Some([60.0, 25.0, 1.85, 5.0]));
    assert_eq!(result.final_objective, None);
    assert!(!dir.path().join("gbest_hist.csv").exists());
}
