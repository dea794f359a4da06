// ABOUTME: The orchestrator's collaborators, injected as trait objects.
// ABOUTME: production() wires the real implementations from a destination-merged config.

use std::sync::Arc;

use crate::config::Config;
use crate::health::{HealthProbe, HealthProber};
use crate::http::{HyperClient, TlsClient};
use crate::notify::{Notifier, NotifierSet};
use crate::proxy::{
    CommandProxy, FileUpstreamStore, ProxyControl, TrafficSwitch, TrafficSwitcher, UpstreamStore,
};
use crate::runtime::{BollardProbe, RuntimeProbe, SkipRuntimeCheck};
use crate::services::{CommandServiceControl, ServiceControl};
use crate::smoke::{SmokeRunner, SmokeTest};

use super::DeployError;
use super::rollback::{RollbackControl, RollbackController};

#[derive(Clone)]
pub struct Ports {
    pub runtime: Arc<dyn RuntimeProbe>,
    pub services: Arc<dyn ServiceControl>,
    pub store: Arc<dyn UpstreamStore>,
    pub proxy: Arc<dyn ProxyControl>,
    pub switcher: Arc<dyn TrafficSwitch>,
    pub prober: Arc<dyn HealthProbe>,
    pub smoke: Arc<dyn SmokeTest>,
    pub rollback: Arc<dyn RollbackControl>,
    pub notifier: Arc<dyn Notifier>,
}

impl Ports {
    pub fn production(config: &Config, destination: &str) -> Result<Self, DeployError> {
        let runtime: Arc<dyn RuntimeProbe> = if config.runtime.skip_check {
            Arc::new(SkipRuntimeCheck)
        } else {
            Arc::new(BollardProbe::new(config.runtime.clone()))
        };

        let services = CommandServiceControl::from_config(config, destination)
            .map_err(|e| DeployError::config_error(e.to_string()))?;

        let store: Arc<dyn UpstreamStore> = Arc::new(FileUpstreamStore::new(&config.proxy.config));
        let proxy: Arc<dyn ProxyControl> = Arc::new(CommandProxy::new(config.proxy.clone()));
        let switcher: Arc<dyn TrafficSwitch> = Arc::new(TrafficSwitcher::new(
            store.clone(),
            proxy.clone(),
            config.detection_fallback,
        ));
        let prober: Arc<dyn HealthProbe> = Arc::new(HealthProber::new(HyperClient::new()));
        let smoke = SmokeRunner::new(
            HyperClient::new(),
            config.smoke.timeout,
            config.smoke.concurrency,
        );
        let rollback = RollbackController::new(switcher.clone(), prober.clone(), config)?;
        let notifier = NotifierSet::from_config(config.notify.as_ref(), webhook_client()?);

        Ok(Self {
            runtime,
            services: Arc::new(services),
            store,
            proxy,
            switcher,
            prober,
            smoke: Arc::new(smoke),
            rollback: Arc::new(rollback),
            notifier: Arc::new(notifier),
        })
    }
}

fn webhook_client() -> Result<TlsClient, DeployError> {
    TlsClient::new().map_err(|e| DeployError::config_error(e.to_string()))
}
