// ABOUTME: Rollback controller: send traffic back to the previous environment.
// ABOUTME: Always ends with a reduced health pass and reports whether recovery was confirmed.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cancel::Cancellation;
use crate::config::{Config, ProbeConfig};
use crate::health::{HealthCheckResult, HealthCheckTarget, HealthProbe, all_healthy};
use crate::proxy::{SwitchOutcome, TrafficSwitch};
use crate::types::{Environment, ServiceTarget};

use super::DeployError;

/// What a rollback did and what it could confirm.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    /// Environment traffic was sent back to.
    pub restored: Environment,
    /// False when the proxy already pointed at `restored`.
    pub switched_back: bool,
    pub recovery_confirmed: bool,
    pub results: Vec<HealthCheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RollbackReport {
    /// A rollback only counts when the switch back worked and recovery was seen.
    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.recovery_confirmed
    }

    /// Mark the rollback as failed even though the switch back looked clean.
    pub fn escalate(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!("MANUAL INTERVENTION REQUIRED: {}", reason);
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{}; {}", existing, reason),
            None => reason,
        });
    }
}

#[async_trait]
pub trait RollbackControl: Send + Sync {
    /// Never cancellable: a rollback runs to completion once started.
    async fn rollback(&self, previous: Environment) -> RollbackReport;
}

pub struct RollbackController {
    switcher: Arc<dyn TrafficSwitch>,
    prober: Arc<dyn HealthProbe>,
    probe: ProbeConfig,
    targets: HashMap<Environment, Vec<HealthCheckTarget>>,
}

impl RollbackController {
    /// Recovery is checked on every service of the restored environment plus the proxy.
    pub fn new(
        switcher: Arc<dyn TrafficSwitch>,
        prober: Arc<dyn HealthProbe>,
        config: &Config,
    ) -> Result<Self, DeployError> {
        let mut targets = HashMap::new();
        for env in Environment::ALL {
            let mut env_targets = config
                .health_targets(env, &ServiceTarget::All)
                .map_err(|e| DeployError::config_error(e.to_string()))?;
            env_targets.extend(config.proxy_health_target());
            targets.insert(env, env_targets);
        }

        Ok(Self {
            switcher,
            prober,
            probe: config.rollback_health,
            targets,
        })
    }
}

#[async_trait]
impl RollbackControl for RollbackController {
    async fn rollback(&self, previous: Environment) -> RollbackReport {
        tracing::warn!("Rolling back: restoring traffic to {}", previous);

        let (switched_back, error) = match self.switcher.switch(previous).await {
            Ok(SwitchOutcome::AlreadyActive(_)) => {
                tracing::info!("{} already serves traffic; no switch needed", previous);
                (false, None)
            }
            Ok(SwitchOutcome::Switched { .. }) => {
                tracing::info!("Traffic restored to {}", previous);
                (true, None)
            }
            Err(e) => {
                tracing::error!("Switching traffic back to {} failed: {}", previous, e);
                (false, Some(e.to_string()))
            }
        };

        let targets = self
            .targets
            .get(&previous)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let results = self
            .prober
            .probe(targets, &self.probe, &Cancellation::never())
            .await;
        let recovery_confirmed = all_healthy(&results);

        let report = RollbackReport {
            restored: previous,
            switched_back,
            recovery_confirmed,
            results,
            error,
        };

        if report.succeeded() {
            tracing::info!("Recovery of {} confirmed", previous);
        } else {
            tracing::error!(
                "MANUAL INTERVENTION REQUIRED: rollback to {} could not be confirmed",
                previous
            );
        }

        report
    }
}
