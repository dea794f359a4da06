// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Post-detection states carry the environment state they act on.

use super::rollback::RollbackReport;
use crate::types::EnvironmentState;

/// Initial state: request accepted, nothing checked yet.
/// Available actions: `preflight()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Preflighted: runtime reachable, proxy running, upstream config present, lock held.
/// Available actions: `detect_environment()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Preflighted;

/// Detected: active and target environments known.
/// Available actions: `deploy_target()`
#[derive(Debug, Clone, Copy)]
pub struct Detected {
    pub(crate) envs: EnvironmentState,
}

/// Target deployed: requested version running in the target slot.
/// Available actions: `health_gate()`, `force_health()`
#[derive(Debug, Clone, Copy)]
pub struct TargetDeployed {
    pub(crate) envs: EnvironmentState,
}

/// Health checked: target passed (or was forced past) the health gate.
/// Available actions: `smoke_gate()`, `skip_smoke()`, `force_smoke()`
#[derive(Debug, Clone, Copy)]
pub struct HealthChecked {
    pub(crate) envs: EnvironmentState,
}

/// Smoke tested: target passed (or skipped, or was forced past) the smoke gate.
/// Available actions: `switch_traffic()`
#[derive(Debug, Clone, Copy)]
pub struct SmokeTested {
    pub(crate) envs: EnvironmentState,
}

/// Switched: the proxy now routes to the target.
/// Available actions: `post_verify()`, `rollback()`
#[derive(Debug, Clone, Copy)]
pub struct Switched {
    pub(crate) envs: EnvironmentState,
}

/// Verified: the switch took effect end to end.
/// Available actions: `cleanup_previous()`, `finish()`
#[derive(Debug, Clone, Copy)]
pub struct Verified {
    pub(crate) envs: EnvironmentState,
}

/// Rolled back: traffic was sent back to the previously active environment.
#[derive(Debug, Clone)]
pub struct RolledBack {
    pub(crate) envs: EnvironmentState,
    pub(crate) report: RollbackReport,
}

/// Read access to what a state knows about the environments.
pub trait DeployState {
    /// Active and target environments, once detected.
    fn envs(&self) -> Option<EnvironmentState>;
}

impl DeployState for Initialized {
    fn envs(&self) -> Option<EnvironmentState> {
        None
    }
}

impl DeployState for Preflighted {
    fn envs(&self) -> Option<EnvironmentState> {
        None
    }
}

macro_rules! detected_state {
    ($($state:ty),*) => {
        $(impl DeployState for $state {
            fn envs(&self) -> Option<EnvironmentState> {
                Some(self.envs)
            }
        })*
    };
}

detected_state!(
    Detected,
    TargetDeployed,
    HealthChecked,
    SmokeTested,
    Switched,
    Verified,
    RolledBack
);
