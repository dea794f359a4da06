// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Deployment struct, the rollback controller and the orchestrator.

mod deployment;
mod error;
mod lock;
mod orchestrator;
mod outcome;
mod ports;
mod rollback;
mod state;
mod transitions;

pub use deployment::{DeployFlags, Deployment, DeploymentRequest};
pub use error::{DeployError, DeployErrorKind, LockHolderInfo};
pub use lock::{DeployLock, LockInfo};
pub use orchestrator::Orchestrator;
pub use outcome::{DeploymentOutcome, EXIT_ROLLBACK_FAILED, FailedStage};
pub use ports::Ports;
pub use rollback::{RollbackControl, RollbackController, RollbackReport};
pub use state::{
    DeployState, Detected, HealthChecked, Initialized, Preflighted, RolledBack, SmokeTested,
    Switched, TargetDeployed, Verified,
};
pub use transitions::TransitionResult;
