//! Shell command execution with captured output and a hard timeout

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, error};

/// Timeout applied when the caller has no step-specific limit
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Captured result of one command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl CommandOutput {
    /// A synthesized failure with no stdout
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            code: 1,
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs shell command strings in a working directory
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> CommandOutput;
}

/// Runs commands through `sh -c`
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> CommandOutput {
        execute_command(command, cwd, timeout).await
    }
}

/// Execute `command` with `sh -c` in `cwd`.
///
/// Never fails: a spawn error or an expired timeout is reported as a
/// non-zero `CommandOutput`. On timeout the child is killed.
pub async fn execute_command(command: &str, cwd: &Path, timeout: Duration) -> CommandOutput {
    debug!("Running `{}` in {}", command, cwd.display());

    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            error!("Error executing command '{}': {}", command, e);
            return CommandOutput::failure(e.to_string());
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // killed by a signal
            code: output.status.code().unwrap_or(-1),
        },
        Ok(Err(e)) => {
            error!("Error executing command '{}': {}", command, e);
            CommandOutput::failure(e.to_string())
        }
        Err(_) => {
            error!(
                "Command timed out after {} seconds: {}",
                timeout.as_secs(),
                command
            );
            CommandOutput::failure(format!(
                "Command timed out after {} seconds",
                timeout.as_secs()
            ))
        }
    }
}
