// ABOUTME: Shell command execution for proxy control and deployment steps.
// ABOUTME: Runs `sh -c` with extra environment, captured output, and a hard timeout.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Result of running a shell command to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Exit status for messages: the code, or "signal" when killed.
    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "signal".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Run `script` through `sh -c`. The child is killed if the timeout fires.
pub async fn run_shell(
    script: &str,
    env: &HashMap<String, String>,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    tracing::debug!("Running `{}`", script);

    let child = Command::new("sh")
        .arg("-c")
        .arg(script)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, child)
        .await
        .map_err(|_| CommandError::Timeout {
            command: script.to_string(),
            timeout,
        })?
        .map_err(|source| CommandError::Spawn {
            command: script.to_string(),
            source,
        })?;

    let result = CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    };

    if result.success {
        tracing::debug!("`{}` completed successfully", script);
    } else {
        tracing::debug!("`{}` failed with {}", script, result.status_label());
    }

    Ok(result)
}
