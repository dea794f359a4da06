// ABOUTME: Runtime reachability check used by PREFLIGHT.
// ABOUTME: Connects to the Docker-compatible API socket with bollard and pings it.

use async_trait::async_trait;
use bollard::Docker;
use snafu::ResultExt;

use super::detection::resolve_runtime;
use super::error::{ConnectionSnafu, PingSnafu, RuntimeError};
use super::types::{RuntimeConfig, RuntimeEndpoint, RuntimeKind};

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait RuntimeProbe: Send + Sync {
    /// Confirm a container runtime is reachable.
    async fn ping(&self) -> Result<RuntimeEndpoint, RuntimeError>;
}

/// Pings the local Docker or Podman API socket.
#[derive(Debug, Clone, Default)]
pub struct BollardProbe {
    config: RuntimeConfig,
}

impl BollardProbe {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RuntimeProbe for BollardProbe {
    async fn ping(&self) -> Result<RuntimeEndpoint, RuntimeError> {
        let endpoint = resolve_runtime(&self.config)?;

        let client = Docker::connect_with_unix(
            &endpoint.socket,
            CONNECT_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .context(ConnectionSnafu {
            socket: endpoint.socket.clone(),
        })?;

        client.ping().await.context(PingSnafu {
            socket: endpoint.socket.clone(),
        })?;

        tracing::debug!("Runtime reachable: {}", endpoint);
        Ok(endpoint)
    }
}

/// Stand-in for hosts where the runtime check is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipRuntimeCheck;

#[async_trait]
impl RuntimeProbe for SkipRuntimeCheck {
    async fn ping(&self) -> Result<RuntimeEndpoint, RuntimeError> {
        tracing::debug!("Runtime check disabled by configuration");
        Ok(RuntimeEndpoint::new(RuntimeKind::Docker, "(not checked)"))
    }
}
