//! Spawning the runner in its own process and capturing its output.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// A fully described runner invocation. Arguments are passed as argv, never
/// through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Everything the runner wrote, decoded lossily as UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Failures of the launcher itself, as opposed to a runner that exited
/// unsuccessfully.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed while capturing runner output: {0}")]
    Capture(#[source] std::io::Error),
    #[error("runner did not finish within {}s and was killed", .0.as_secs())]
    TimedOut(Duration),
}

/// Runs a [`RunnerCommand`] to completion.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(
        &self,
        command: &RunnerCommand,
        timeout: Option<Duration>,
    ) -> Result<CapturedOutput, LaunchError>;
}

/// Launches real child processes with tokio.
///
/// On unix the runner leads its own process group, so a timeout tears down
/// the engine it started along with it. The child is also spawned with
/// `kill_on_drop` as a last resort.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(
        &self,
        command: &RunnerCommand,
        timeout: Option<Duration>,
    ) -> Result<CapturedOutput, LaunchError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: command.program.display().to_string(),
            source,
        })?;

        let pid = child.id();
        debug!("Capturing output of runner pid {:?}", pid);
        let wait = child.wait_with_output();

        let output = match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output,
                Err(_) => {
                    warn!("Runner exceeded {}s, terminating its process group", limit.as_secs());
                    if let Some(pid) = pid {
                        terminate_process_group(pid).await;
                    }
                    return Err(LaunchError::TimedOut(limit));
                }
            },
            None => wait.await,
        }
        .map_err(LaunchError::Capture)?;

        Ok(CapturedOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// SIGTERM the whole group, give it a moment, then SIGKILL whatever is left.
#[cfg(unix)]
async fn terminate_process_group(group_leader_pid: u32) {
    if group_leader_pid == 0 {
        return;
    }
    let pgid = format!("-{group_leader_pid}");

    for signal in ["-TERM", "-KILL"] {
        let status = Command::new("kill")
            .arg(signal)
            .arg("--")
            .arg(&pgid)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        if let Err(e) = status {
            warn!("Failed to send {} to process group {}: {}", signal, pgid, e);
        }
        if signal == "-TERM" {
            tokio::time::sleep(TERMINATE_GRACE).await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_process_group(_group_leader_pid: u32) {}

#[cfg(unix)]
const TERMINATE_GRACE: Duration = Duration::from_millis(250);
