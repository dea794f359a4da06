// ABOUTME: Deployment orchestrator: drives the typestate deployment gate by gate.
// ABOUTME: Classifies each failure, forces or rolls back as the flags and stage allow, then notifies.

use chrono::Utc;

use crate::cancel::Cancellation;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::notify::{DeploymentEvent, EventStatus, LogNotifier, Notifier};
use crate::types::{Environment, EnvironmentState};

use super::deployment::{Deployment, DeploymentRequest};
use super::error::{DeployError, DeployErrorKind};
use super::outcome::{DeploymentOutcome, FailedStage};
use super::ports::Ports;
use super::rollback::RollbackReport;
use super::state::{DeployState, RolledBack};

type Progress = Box<dyn Fn(&str) + Send + Sync>;

pub struct Orchestrator {
    config: Config,
    ports: Ports,
    progress: Option<Progress>,
}

/// A run that reached DONE.
struct Done {
    envs: EnvironmentState,
    live: Environment,
    diagnostics: Diagnostics,
}

/// A run that stopped at a gate.
struct Failure {
    stage: FailedStage,
    error: DeployError,
    envs: Option<EnvironmentState>,
    rollback: Option<RollbackReport>,
    diagnostics: Diagnostics,
}

fn fail<S: DeployState>(deployment: Deployment<S>, stage: FailedStage, error: DeployError) -> Failure {
    let stage = if error.kind() == DeployErrorKind::Cancelled {
        FailedStage::Cancelled
    } else {
        stage
    };
    tracing::error!("{} gate failed: {}", stage, error);

    Failure {
        stage,
        error,
        envs: deployment.environments(),
        rollback: None,
        diagnostics: deployment.into_diagnostics(),
    }
}

fn rolled_back(deployment: Deployment<RolledBack>, stage: FailedStage, error: DeployError) -> Failure {
    let report = deployment.report().clone();
    let mut failure = fail(deployment, stage, error);
    failure.rollback = Some(report);
    failure
}

impl Orchestrator {
    /// `config` must already carry the destination's overrides.
    pub fn new(config: Config, ports: Ports) -> Self {
        Self {
            config,
            ports,
            progress: None,
        }
    }

    /// Called with a short message as each gate starts.
    pub fn with_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    fn progress(&self, message: &str) {
        if let Some(ref progress) = self.progress {
            progress(message);
        }
    }

    /// Run every gate in order. Never panics and never returns early without an outcome.
    pub async fn run(&self, request: DeploymentRequest, cancel: &Cancellation) -> DeploymentOutcome {
        let project = self.config.project.to_string();
        let destination = request.destination.clone();
        let version = request.version.to_string();
        let dry_run = request.flags.dry_run;

        let mut outcome = match self.drive(request, cancel).await {
            Ok(done) => DeploymentOutcome {
                success: true,
                project,
                destination,
                version,
                final_environment: Some(done.live),
                deployed_environment: (!dry_run).then_some(done.envs.target),
                failed_stage: None,
                rollback_performed: false,
                rollback: None,
                dry_run,
                error: None,
                warnings: done.diagnostics.messages(),
            },
            Err(failure) => {
                let final_environment = match (&failure.rollback, failure.envs) {
                    // Nothing was switched, so the live side is what detection saw
                    (None, Some(envs)) => Some(envs.active),
                    _ => self.live_environment().await,
                };
                DeploymentOutcome {
                    success: false,
                    project,
                    destination,
                    version,
                    final_environment,
                    deployed_environment: failure
                        .envs
                        .filter(|_| !dry_run)
                        .map(|envs| envs.target),
                    failed_stage: Some(failure.stage),
                    rollback_performed: failure.rollback.is_some(),
                    rollback: failure.rollback,
                    dry_run,
                    error: Some(failure.error.to_string()),
                    warnings: failure.diagnostics.messages(),
                }
            }
        };

        self.notify(&mut outcome).await;
        outcome
    }

    async fn drive(&self, request: DeploymentRequest, cancel: &Cancellation) -> Result<Done, Failure> {
        let ports = &self.ports;
        let skip_tests = request.flags.skip_tests;
        let cleanup = request.cleanup;
        let deployment = Deployment::new(self.config.clone(), request);

        self.progress("Running preflight checks");
        let deployment = deployment
            .preflight(ports)
            .await
            .map_err(|(d, e)| fail(d, FailedStage::Preflight, e))?
            .checkpoint(cancel)
            .map_err(|(d, e)| fail(d, FailedStage::Preflight, e))?;

        self.progress("Detecting active environment");
        let deployment = deployment
            .detect_environment(ports.switcher.as_ref())
            .await
            .map_err(|(d, e)| fail(d, FailedStage::Preflight, e))?;

        self.progress("Deploying target environment");
        let deployment = deployment
            .deploy_target(ports.services.as_ref())
            .await
            .map_err(|(d, e)| fail(d, FailedStage::Deploy, e))?
            .checkpoint(cancel)
            .map_err(|(d, e)| fail(d, FailedStage::Deploy, e))?;

        self.progress("Running health gate");
        let deployment = match deployment.health_gate(ports.prober.as_ref(), cancel).await {
            Ok(d) => d,
            Err((d, e)) => d
                .force_health(e)
                .map_err(|(d, e)| fail(d, FailedStage::Health, e))?,
        }
        .checkpoint(cancel)
        .map_err(|(d, e)| fail(d, FailedStage::Health, e))?;

        let deployment = if skip_tests {
            deployment.skip_smoke()
        } else {
            self.progress("Running smoke gate");
            match deployment.smoke_gate(ports.smoke.as_ref(), cancel).await {
                Ok(d) => d,
                Err((d, e)) => d
                    .force_smoke(e)
                    .map_err(|(d, e)| fail(d, FailedStage::Smoke, e))?,
            }
        }
        .checkpoint(cancel)
        .map_err(|(d, e)| fail(d, FailedStage::Smoke, e))?;

        self.progress("Switching traffic");
        let deployment = match deployment.switch_traffic(ports.switcher.as_ref()).await {
            Ok(d) => d,
            Err((d, e)) => {
                self.progress("Rolling back");
                let d = d.rollback(ports.rollback.as_ref(), &e).await;
                return Err(rolled_back(d, FailedStage::Switch, e));
            }
        };

        self.progress("Verifying switch");
        let verified = match deployment.checkpoint(cancel) {
            Ok(d) => d.post_verify(ports.prober.as_ref(), cancel).await,
            Err(cancelled) => Err(cancelled),
        };
        let deployment = match verified {
            Ok(d) => d,
            Err((d, e)) if d.is_dry_run() => return Err(fail(d, FailedStage::PostVerify, e)),
            Err((d, e)) => {
                self.progress("Rolling back");
                let d = d.rollback(ports.rollback.as_ref()).await;
                return Err(rolled_back(d, FailedStage::PostVerify, e));
            }
        };

        let deployment = if cleanup {
            self.progress("Cleaning up previous environment");
            deployment.cleanup_previous(ports.services.as_ref()).await
        } else {
            deployment
        };

        let live = deployment.live();
        let envs = deployment.state.envs;
        Ok(Done {
            envs,
            live,
            diagnostics: deployment.into_diagnostics(),
        })
    }

    /// Re-read the upstream config. None when it cannot be read or is ambiguous.
    async fn live_environment(&self) -> Option<Environment> {
        self.ports
            .switcher
            .detect()
            .await
            .ok()
            .filter(|detection| !detection.fallback_used())
            .map(|detection| detection.state.active)
    }

    async fn notify(&self, outcome: &mut DeploymentOutcome) {
        let event = DeploymentEvent {
            status: if outcome.success {
                EventStatus::Success
            } else {
                EventStatus::Failure
            },
            project: outcome.project.clone(),
            destination: outcome.destination.clone(),
            version: outcome.version.clone(),
            environment: outcome.final_environment,
            timestamp: Utc::now(),
            failed_stage: outcome.failed_stage.map(|s| s.to_string()),
            rollback_performed: outcome.rollback_performed,
            dry_run: outcome.dry_run,
        };

        let delivered = if outcome.dry_run {
            LogNotifier.notify(&event).await
        } else {
            self.ports.notifier.notify(&event).await
        };

        if let Err(e) = delivered {
            tracing::warn!("Notification delivery failed: {}", e);
            outcome
                .warnings
                .push(format!("Notification delivery failed: {}", e));
        }
    }
}
