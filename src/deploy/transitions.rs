// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state, or itself with the error.

use crate::cancel::Cancellation;
use crate::diagnostics::Warning;
use crate::health::{HealthCheckTarget, HealthProbe, all_healthy, unhealthy_targets};
use crate::proxy::{Recovery, SwitchOutcome, TrafficSwitch};
use crate::services::ServiceControl;
use crate::smoke::SmokeTest;
use crate::types::{Environment, EnvironmentState, ServiceTarget};

use super::Deployment;
use super::error::{DeployError, DeployErrorKind};
use super::lock::DeployLock;
use super::ports::Ports;
use super::rollback::RollbackControl;
use super::state::{
    Detected, HealthChecked, Initialized, Preflighted, RolledBack, SmokeTested, Switched,
    TargetDeployed, Verified,
};

/// Result type for transitions; on failure the caller gets the deployment back.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    /// Internal helper to transition to a new state.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            config: self.config,
            request: self.request,
            lock: self.lock,
            diagnostics: self.diagnostics,
            state,
        }
    }

    /// Stop here if cancellation was requested.
    pub fn checkpoint(self, cancel: &Cancellation) -> Result<Self, (Self, DeployError)> {
        if cancel.is_cancelled() {
            tracing::warn!("Cancellation requested; stopping");
            return Err((self, DeployError::Cancelled));
        }
        Ok(self)
    }

    fn probe_targets(
        &self,
        env: Environment,
        target: &ServiceTarget,
    ) -> Result<Vec<HealthCheckTarget>, DeployError> {
        self.config
            .health_targets(env, target)
            .map_err(|e| DeployError::config_error(e.to_string()))
    }
}

// =============================================================================
// Initialized -> Preflighted
// =============================================================================

impl Deployment<Initialized> {
    /// Verify the environment is ready, then take the deploy lock and clear up
    /// after any interrupted switch.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Runtime` when the container runtime is unreachable,
    /// `DeployError::Preflight` when the proxy is down or its upstream config is
    /// missing, and `DeployError::LockHeld` when another run holds the lock.
    #[must_use = "deployment state must be used"]
    pub async fn preflight(mut self, ports: &Ports) -> TransitionResult<Preflighted, Initialized> {
        match ports.runtime.ping().await {
            Ok(endpoint) => tracing::debug!("Container runtime reachable: {}", endpoint),
            Err(e) => return Err((self, e.into())),
        }

        if let Err(e) = self.config.select_services(&self.request.target) {
            return Err((self, DeployError::Preflight(e.to_string())));
        }

        if !ports.store.exists() {
            let msg = format!("upstream config {} not found", ports.store.location());
            return Err((self, DeployError::Preflight(msg)));
        }

        match ports.proxy.is_running().await {
            Ok(true) => {}
            Ok(false) => {
                let msg = "reverse proxy is not running".to_string();
                return Err((self, DeployError::Preflight(msg)));
            }
            Err(e) => {
                let msg = format!("reverse proxy status check failed: {}", e);
                return Err((self, DeployError::Preflight(msg)));
            }
        }

        let dry_run = self.is_dry_run();
        if !dry_run {
            match DeployLock::acquire(
                &self.config.lock_dir(),
                &self.config.project,
                self.request.version.as_str(),
                self.request.break_lock,
                &mut self.diagnostics,
            ) {
                Ok(lock) => self.lock = Some(lock),
                Err(e) => return Err((self, e)),
            }
        }

        match ports.switcher.recover(dry_run).await {
            Ok(None) => {}
            Ok(Some(Recovery::Pending)) => self.diagnostics.warn(Warning::recovery(
                "Upstream backup found from an interrupted switch; a real run would recover it",
            )),
            Ok(Some(Recovery::RestoredBackup)) => self.diagnostics.warn(Warning::recovery(
                "Restored and reloaded the upstream config from the backup of an interrupted switch",
            )),
            Err(e) => return Err((self, e.into())),
        }

        tracing::info!("Preflight checks passed");
        Ok(self.transition(Preflighted))
    }
}

// =============================================================================
// Preflighted -> Detected
// =============================================================================

impl Deployment<Preflighted> {
    /// Work out which environment is live. Ambiguity resolves through the
    /// configured fallback policy unless that policy is `fail`.
    #[must_use = "deployment state must be used"]
    pub async fn detect_environment(
        mut self,
        switcher: &dyn TrafficSwitch,
    ) -> TransitionResult<Detected, Preflighted> {
        let detection = match switcher.detect().await {
            Ok(detection) => detection,
            Err(e) => return Err((self, e.into())),
        };

        if let Some(ref ambiguity) = detection.ambiguity {
            self.diagnostics.warn(Warning::detection_fallback(format!(
                "{}; assumed {} is active",
                ambiguity, detection.state.active
            )));
        }

        let envs = detection.state;
        tracing::info!("Active environment: {}, target: {}", envs.active, envs.target);
        Ok(self.transition(Detected { envs }))
    }
}

// =============================================================================
// Detected -> TargetDeployed
// =============================================================================

impl Deployment<Detected> {
    /// Start or update the requested services in the target environment.
    /// Never touches the live environment's traffic.
    #[must_use = "deployment state must be used"]
    pub async fn deploy_target(
        self,
        services: &dyn ServiceControl,
    ) -> TransitionResult<TargetDeployed, Detected> {
        let envs = self.state.envs;

        if self.is_dry_run() {
            tracing::info!(
                "Dry run: would deploy {} ({}) to {}",
                self.request.version,
                self.request.target,
                envs.target
            );
            return Ok(self.transition(TargetDeployed { envs }));
        }

        tracing::info!(
            "Deploying {} ({}) to {}",
            self.request.version,
            self.request.target,
            envs.target
        );
        if let Err(e) = services
            .deploy(envs.target, &self.request.version, &self.request.target)
            .await
        {
            return Err((self, e.into()));
        }

        Ok(self.transition(TargetDeployed { envs }))
    }
}

// =============================================================================
// TargetDeployed -> HealthChecked
// =============================================================================

impl Deployment<TargetDeployed> {
    /// Probe the deployed services until healthy or out of budget.
    /// Dry runs probe the live environment as a stand-in.
    #[must_use = "deployment state must be used"]
    pub async fn health_gate(
        self,
        prober: &dyn HealthProbe,
        cancel: &Cancellation,
    ) -> TransitionResult<HealthChecked, TargetDeployed> {
        let envs = self.state.envs;
        let env = if self.is_dry_run() {
            envs.active
        } else {
            envs.target
        };

        let targets = match self.probe_targets(env, &self.request.target) {
            Ok(targets) => targets,
            Err(e) => return Err((self, e)),
        };

        tracing::info!("Health gate: probing {} target(s) in {}", targets.len(), env);
        let results = prober.probe(&targets, &self.config.health, cancel).await;

        if cancel.is_cancelled() {
            return Err((self, DeployError::Cancelled));
        }

        if !all_healthy(&results) {
            let failed = unhealthy_targets(&results);
            return Err((self, DeployError::HealthGate { failed }));
        }

        tracing::info!("Health gate passed");
        Ok(self.transition(HealthChecked { envs }))
    }

    /// Accept a failed health gate. Only allowed with `--force`, and only for
    /// a gate failure; anything else comes straight back.
    #[must_use = "deployment state must be used"]
    pub fn force_health(
        mut self,
        error: DeployError,
    ) -> TransitionResult<HealthChecked, TargetDeployed> {
        if !self.request.flags.force || error.kind() != DeployErrorKind::HealthGate {
            return Err((self, error));
        }

        self.diagnostics
            .warn(Warning::forced_gate(format!("Forced past failed gate: {}", error)));
        let envs = self.state.envs;
        Ok(self.transition(HealthChecked { envs }))
    }
}

// =============================================================================
// HealthChecked -> SmokeTested
// =============================================================================

impl Deployment<HealthChecked> {
    /// Run the smoke battery against the target (the live environment on dry runs).
    #[must_use = "deployment state must be used"]
    pub async fn smoke_gate(
        mut self,
        smoke: &dyn SmokeTest,
        cancel: &Cancellation,
    ) -> TransitionResult<SmokeTested, HealthChecked> {
        let envs = self.state.envs;
        let env = if self.is_dry_run() {
            envs.active
        } else {
            envs.target
        };

        let base_url = self.config.smoke_base_url(env);
        let assertions = self.config.smoke_assertions();
        tracing::info!(
            "Smoke gate: {} assertion(s) against {}",
            assertions.len(),
            base_url
        );

        let result = smoke.run(&base_url, &assertions, cancel).await;

        if cancel.is_cancelled() {
            return Err((self, DeployError::Cancelled));
        }

        for (name, warning) in result.warnings() {
            self.diagnostics
                .warn(Warning::soft_assertion(format!("{}: {}", name, warning)));
        }

        if !result.verdict() {
            for failure in result.failures() {
                tracing::warn!(
                    "Smoke assertion '{}' failed: expected {}, got {}",
                    failure.name,
                    failure.expected,
                    failure
                        .actual_status
                        .map(|s| s.to_string())
                        .or_else(|| failure.error.clone())
                        .unwrap_or_else(|| "no response".to_string())
                );
            }
            let error = DeployError::SmokeGate {
                failed: result.failed,
                total: result.assertions.len(),
            };
            return Err((self, error));
        }

        tracing::info!("Smoke gate passed ({} assertions)", result.passed);
        Ok(self.transition(SmokeTested { envs }))
    }

    /// Skip the smoke gate (`--skip-tests`).
    #[must_use = "deployment state must be used"]
    pub fn skip_smoke(self) -> Deployment<SmokeTested> {
        tracing::info!("Smoke gate skipped");
        let envs = self.state.envs;
        self.transition(SmokeTested { envs })
    }

    /// Accept a failed smoke gate. Same rules as `force_health`.
    #[must_use = "deployment state must be used"]
    pub fn force_smoke(mut self, error: DeployError) -> TransitionResult<SmokeTested, HealthChecked> {
        if !self.request.flags.force || error.kind() != DeployErrorKind::SmokeGate {
            return Err((self, error));
        }

        self.diagnostics
            .warn(Warning::forced_gate(format!("Forced past failed gate: {}", error)));
        let envs = self.state.envs;
        Ok(self.transition(SmokeTested { envs }))
    }
}

// =============================================================================
// SmokeTested -> Switched
// =============================================================================

impl Deployment<SmokeTested> {
    /// Point the proxy at the target environment.
    #[must_use = "deployment state must be used"]
    pub async fn switch_traffic(
        self,
        switcher: &dyn TrafficSwitch,
    ) -> TransitionResult<Switched, SmokeTested> {
        let envs = self.state.envs;

        if self.is_dry_run() {
            tracing::info!(
                "Dry run: would switch traffic from {} to {}",
                envs.active,
                envs.target
            );
            return Ok(self.transition(Switched { envs }));
        }

        match switcher.switch(envs.target).await {
            Ok(SwitchOutcome::Switched { .. }) => {
                tracing::info!("Traffic switched from {} to {}", envs.active, envs.target);
            }
            Ok(SwitchOutcome::AlreadyActive(env)) => {
                tracing::info!("{} already serves traffic", env);
            }
            Err(e) => return Err((self, e.into())),
        }

        Ok(self.transition(Switched { envs }))
    }

    /// Undo a switch that failed partway with `cause`.
    ///
    /// When the switcher could not put the old config back, the live proxy
    /// state is unknown. Unless the rollback itself reloaded the previous
    /// environment, it cannot count as a recovery.
    #[must_use = "deployment state must be used"]
    pub async fn rollback(
        self,
        controller: &dyn RollbackControl,
        cause: &DeployError,
    ) -> Deployment<RolledBack> {
        let envs = self.state.envs;
        let mut deployment = rolled_back(self, envs, controller).await;

        let report = &mut deployment.state.report;
        if let DeployError::Switch(e) = cause
            && !e.config_restored()
            && !report.switched_back
        {
            report.escalate(format!(
                "proxy may still run an unrestored upstream config after a failed switch: {}",
                e
            ));
        }
        deployment
    }
}

// =============================================================================
// Switched -> Verified
// =============================================================================

impl Deployment<Switched> {
    /// Confirm the switch end to end: every service in the now-live
    /// environment plus the proxy's own health endpoint.
    #[must_use = "deployment state must be used"]
    pub async fn post_verify(
        self,
        prober: &dyn HealthProbe,
        cancel: &Cancellation,
    ) -> TransitionResult<Verified, Switched> {
        let envs = self.state.envs;

        if self.is_dry_run() {
            tracing::debug!("Dry run: post-switch verification skipped");
            return Ok(self.transition(Verified { envs }));
        }

        let mut targets = match self.probe_targets(envs.target, &ServiceTarget::All) {
            Ok(targets) => targets,
            Err(e) => return Err((self, e)),
        };
        targets.extend(self.config.proxy_health_target());

        tracing::info!("Post-switch verification of {}", envs.target);
        let results = prober.probe(&targets, &self.config.health, cancel).await;

        if cancel.is_cancelled() {
            return Err((self, DeployError::Cancelled));
        }

        if !all_healthy(&results) {
            let failed = unhealthy_targets(&results);
            return Err((self, DeployError::PostVerify { failed }));
        }

        tracing::info!("Post-switch verification passed");
        Ok(self.transition(Verified { envs }))
    }

    /// Send traffic back to the previously active environment.
    #[must_use = "deployment state must be used"]
    pub async fn rollback(self, controller: &dyn RollbackControl) -> Deployment<RolledBack> {
        let envs = self.state.envs;
        rolled_back(self, envs, controller).await
    }
}

async fn rolled_back<S>(
    deployment: Deployment<S>,
    envs: EnvironmentState,
    controller: &dyn RollbackControl,
) -> Deployment<RolledBack> {
    let report = controller.rollback(envs.active).await;
    deployment.transition(RolledBack { envs, report })
}

// =============================================================================
// Verified
// =============================================================================

impl Deployment<Verified> {
    /// Tear down what the previous environment no longer needs. Failure is a warning.
    pub async fn cleanup_previous(mut self, services: &dyn ServiceControl) -> Self {
        let previous = self.state.envs.active;

        if self.is_dry_run() {
            tracing::info!("Dry run: would clean up {}", previous);
            return self;
        }

        tracing::info!("Cleaning up {}", previous);
        if let Err(e) = services.cleanup(previous).await {
            self.diagnostics
                .warn(Warning::cleanup(format!("Cleanup of {} failed: {}", previous, e)));
        }
        self
    }
}
