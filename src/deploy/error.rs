// ABOUTME: Error types for deployment gates and the deploy lock.
// ABOUTME: DeployErrorKind classifies errors for exit codes and tests.

use chrono::{DateTime, Utc};

use crate::proxy::{SwitchError, UpstreamError};
use crate::runtime::RuntimeError;
use crate::services::ServiceError;

/// Information about who holds a deploy lock.
#[derive(Debug, Clone)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub version: String,
}

/// Errors that can occur during deployment state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Environment not ready: proxy down, config missing, and similar.
    #[error("preflight check failed: {0}")]
    Preflight(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("upstream config: {0}")]
    Upstream(#[from] UpstreamError),

    /// Lock acquisition failed.
    #[error("deploy lock error: {0}")]
    LockError(String),

    /// Lock is held by another process.
    #[error(
        "deployment in progress: lock held by {} (pid {}, version {}) since {}",
        .0.holder, .0.pid, .0.version, .0.started_at
    )]
    LockHeld(LockHolderInfo),

    #[error("deploy failed: {0}")]
    Service(#[from] ServiceError),

    #[error("health gate failed: {} unhealthy", .failed.join(", "))]
    HealthGate { failed: Vec<String> },

    #[error("smoke gate failed: {failed} of {total} assertions failed")]
    SmokeGate { failed: usize, total: usize },

    #[error("traffic switch failed: {0}")]
    Switch(#[from] SwitchError),

    #[error("post-switch verification failed: {} unhealthy", .failed.join(", "))]
    PostVerify { failed: Vec<String> },

    #[error("deployment cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl DeployError {
    /// Create a lock error.
    pub fn lock_error(msg: impl Into<String>) -> Self {
        DeployError::LockError(msg.into())
    }

    /// Create a lock held error.
    pub fn lock_held(
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
        version: String,
    ) -> Self {
        DeployError::LockHeld(LockHolderInfo {
            holder,
            pid,
            started_at,
            version,
        })
    }

    /// Create a config error.
    pub fn config_error(msg: impl Into<String>) -> Self {
        DeployError::ConfigError(msg.into())
    }

    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Preflight(_) => DeployErrorKind::Preflight,
            DeployError::Runtime(_) => DeployErrorKind::RuntimeUnavailable,
            DeployError::Upstream(_) => DeployErrorKind::Upstream,
            DeployError::LockError(_) => DeployErrorKind::LockError,
            DeployError::LockHeld(_) => DeployErrorKind::LockHeld,
            DeployError::Service(_) => DeployErrorKind::DeployStep,
            DeployError::HealthGate { .. } => DeployErrorKind::HealthGate,
            DeployError::SmokeGate { .. } => DeployErrorKind::SmokeGate,
            DeployError::Switch(_) => DeployErrorKind::Switch,
            DeployError::PostVerify { .. } => DeployErrorKind::PostVerify,
            DeployError::Cancelled => DeployErrorKind::Cancelled,
            DeployError::ConfigError(_) => DeployErrorKind::Config,
        }
    }
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Preflight,
    RuntimeUnavailable,
    Upstream,
    LockError,
    LockHeld,
    DeployStep,
    HealthGate,
    SmokeGate,
    Switch,
    PostVerify,
    Cancelled,
    Config,
}
