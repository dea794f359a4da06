// ABOUTME: Service control surface: deploy a version into a slot, clean a slot up.
// ABOUTME: Steps are opaque shell commands; only their success or failure matters.

mod steps;

pub use steps::{CommandServiceControl, Step, StepContext};

use async_trait::async_trait;

use crate::command::CommandError;
use crate::types::{Environment, ServiceTarget, Version};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{step} step failed ({status}): {stderr}")]
    StepFailed {
        step: Step,
        status: String,
        stderr: String,
    },

    #[error("{step} step could not run: {source}")]
    Command {
        step: Step,
        #[source]
        source: CommandError,
    },

    #[error("invalid step environment: {0}")]
    Environment(String),
}

impl ServiceError {
    pub fn step(&self) -> Option<Step> {
        match self {
            ServiceError::StepFailed { step, .. } | ServiceError::Command { step, .. } => {
                Some(*step)
            }
            ServiceError::Environment(_) => None,
        }
    }
}

#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Start or update `target` in `slot` at `version`. Never touches the live slot's traffic.
    async fn deploy(
        &self,
        slot: Environment,
        version: &Version,
        target: &ServiceTarget,
    ) -> Result<(), ServiceError>;

    /// Tear down what a slot no longer needs. Callers treat failure as a warning.
    async fn cleanup(&self, slot: Environment) -> Result<(), ServiceError>;
}
