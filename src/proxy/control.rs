// ABOUTME: Reverse proxy control surface: running check, config validation, reload.
// ABOUTME: CommandProxy drives the proxy through configured shell commands.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::command::{CommandError, run_shell};
use crate::config::ProxyConfig;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}

#[async_trait]
pub trait ProxyControl: Send + Sync {
    async fn is_running(&self) -> Result<bool, ProxyError>;

    /// Check the proxy's configuration with its own validator.
    async fn validate(&self) -> Result<(), ProxyError>;

    /// Reload in place without dropping in-flight connections.
    async fn reload(&self) -> Result<(), ProxyError>;
}

#[derive(Debug, Clone)]
pub struct CommandProxy {
    config: ProxyConfig,
}

impl CommandProxy {
    pub fn new(config: ProxyConfig) -> Self {
        Self { config }
    }

    async fn run_checked(&self, command: &str) -> Result<(), ProxyError> {
        let output = run_shell(command, &HashMap::new(), self.config.command_timeout).await?;
        if output.success {
            Ok(())
        } else {
            Err(ProxyError::Failed {
                command: command.to_string(),
                status: output.status_label(),
                stderr: output.stderr,
            })
        }
    }
}

#[async_trait]
impl ProxyControl for CommandProxy {
    async fn is_running(&self) -> Result<bool, ProxyError> {
        let output = run_shell(
            &self.config.status,
            &HashMap::new(),
            self.config.command_timeout,
        )
        .await?;
        Ok(output.success)
    }

    async fn validate(&self) -> Result<(), ProxyError> {
        self.run_checked(&self.config.validate).await
    }

    async fn reload(&self) -> Result<(), ProxyError> {
        tracing::info!("Reloading proxy");
        self.run_checked(&self.config.reload).await
    }
}
