// ABOUTME: Errors that end a CLI command before a deployment outcome exists.
// ABOUTME: Config and usage problems exit 1; lock and proxy problems count as preflight failures.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::{DeployError, DeployErrorKind, FailedStage};
use crate::proxy::SwitchError;
use crate::types::{ParseEnvironmentError, ServiceNameError, VersionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown destination: {0}")]
    UnknownDestination(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid version: {0}")]
    Version(#[from] VersionError),

    #[error("invalid service name: {0}")]
    ServiceName(#[from] ServiceNameError),

    #[error(transparent)]
    Environment(#[from] ParseEnvironmentError),

    #[error(transparent)]
    Switch(#[from] SwitchError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Process exit code when this error ends a command.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Deploy(e) => match e.kind() {
                DeployErrorKind::Cancelled => FailedStage::Cancelled.exit_code(),
                DeployErrorKind::Config => EXIT_CONFIG,
                _ => FailedStage::Preflight.exit_code(),
            },
            Error::Switch(_) => FailedStage::Preflight.exit_code(),
            _ => EXIT_CONFIG,
        }
    }
}

/// Exit code for configuration and usage errors.
pub const EXIT_CONFIG: i32 = 1;

pub type Result<T> = std::result::Result<T, Error>;
