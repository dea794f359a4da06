// ABOUTME: Generic deployment struct parameterized by state marker, plus the run request.
// ABOUTME: State types carry the detected environments for compile-time guarantees.

use crate::config::Config;
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::{Environment, EnvironmentState, ServiceName, ServiceTarget, Version};

use super::lock::DeployLock;
use super::rollback::RollbackReport;
use super::state::{DeployState, Initialized, RolledBack, Verified};

/// Gate overrides and modes for a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployFlags {
    /// Skip the smoke gate entirely.
    pub skip_tests: bool,
    /// Proceed past a failed health or smoke gate with a warning.
    pub force: bool,
    /// Run the read-only steps only; nothing is deployed or switched.
    pub dry_run: bool,
}

/// What the operator asked for.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    /// The destination name from the command line.
    pub destination: String,
    pub version: Version,
    pub target: ServiceTarget,
    pub flags: DeployFlags,
    /// Break a fresh lock held by another run.
    pub break_lock: bool,
    /// Run the cleanup step on the previous environment after success.
    pub cleanup: bool,
}

impl DeploymentRequest {
    pub fn new(destination: impl Into<String>, version: Version) -> Self {
        Self {
            destination: destination.into(),
            version,
            target: ServiceTarget::All,
            flags: DeployFlags::default(),
            break_lock: false,
            cleanup: false,
        }
    }
}

/// A deployment in progress, parameterized by its current state.
///
/// The state type parameter `S` carries state-specific data (the detected
/// active and target environments) directly in the state type, so a
/// transition can only run once the data it needs exists.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) config: Config,
    pub(crate) request: DeploymentRequest,
    pub(crate) lock: Option<DeployLock>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    /// Create a new deployment. `config` must already carry the destination's overrides.
    pub fn new(config: Config, request: DeploymentRequest) -> Self {
        Deployment {
            config,
            request,
            lock: None,
            diagnostics: Diagnostics::default(),
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    /// Get the project name from config.
    pub fn project(&self) -> &ServiceName {
        &self.config.project
    }

    /// Get the config.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn request(&self) -> &DeploymentRequest {
        &self.request
    }

    pub fn is_dry_run(&self) -> bool {
        self.request.flags.dry_run
    }

    pub fn warnings(&self) -> &[Warning] {
        self.diagnostics.warnings()
    }

    /// Release the lock and hand back the warnings collected so far.
    pub fn into_diagnostics(mut self) -> Diagnostics {
        if let Some(lock) = self.lock.take() {
            let path = lock.path().to_path_buf();
            if let Err(e) = lock.release() {
                self.diagnostics.warn(Warning::lock_release(format!(
                    "Failed to remove deploy lock {}: {}",
                    path.display(),
                    e
                )));
            }
        }
        self.diagnostics
    }
}

impl<S: DeployState> Deployment<S> {
    /// Active and target environments, once detected.
    pub fn environments(&self) -> Option<EnvironmentState> {
        self.state.envs()
    }
}

impl Deployment<Verified> {
    /// The environment now serving traffic.
    pub fn live(&self) -> Environment {
        if self.is_dry_run() {
            self.state.envs.active
        } else {
            self.state.envs.target
        }
    }
}

impl Deployment<RolledBack> {
    pub fn report(&self) -> &RollbackReport {
        &self.state.report
    }
}
