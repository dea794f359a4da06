// ABOUTME: Configuration types and parsing for cutover.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and destination merging.

mod deserialize;
mod env_value;
mod healthcheck;
mod init;
mod notify;
mod proxy;
mod service;
mod smoke;
mod steps;

pub use env_value::{EnvValue, RESERVED_PREFIX, resolve_env_map};
pub use healthcheck::ProbeConfig;
pub use init::init_config;
pub use notify::NotifyConfig;
pub use proxy::ProxyConfig;
pub use service::{EnvironmentConfig, EnvironmentsConfig, ServiceConfig, SlotPorts};
pub use smoke::SmokeConfig;
pub use steps::StepsConfig;

use crate::error::{Error, Result};
use crate::health::HealthCheckTarget;
use crate::proxy::DetectionFallback;
use crate::runtime::RuntimeConfig;
use crate::smoke::SmokeAssertion;
use crate::types::{Environment, ServiceName, ServiceTarget};
use deserialize::{deserialize_service_name, deserialize_services};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "cutover.yml";
pub const CONFIG_FILENAME_ALT: &str = "cutover.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".cutover/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_service_name")]
    pub project: ServiceName,

    pub proxy: ProxyConfig,

    #[serde(default)]
    pub environments: EnvironmentsConfig,

    #[serde(deserialize_with = "deserialize_services")]
    pub services: NonEmpty<ServiceConfig>,

    #[serde(default)]
    pub health: ProbeConfig,

    #[serde(default = "ProbeConfig::reduced")]
    pub rollback_health: ProbeConfig,

    #[serde(default)]
    pub smoke: SmokeConfig,

    pub steps: StepsConfig,

    /// Extra environment for step commands.
    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub lock_dir: Option<PathBuf>,

    #[serde(default)]
    pub detection_fallback: DetectionFallback,

    #[serde(default)]
    pub notify: Option<NotifyConfig>,

    #[serde(default)]
    pub destinations: HashMap<String, Destination>,
}

/// Per-destination overrides (e.g. `production`, `staging`).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Destination {
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    #[serde(default)]
    pub environments: Option<EnvironmentsConfig>,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub steps: Option<StepsConfig>,

    #[serde(default)]
    pub notify: Option<NotifyConfig>,

    #[serde(default)]
    pub lock_dir: Option<PathBuf>,

    #[serde(default)]
    pub detection_fallback: Option<DetectionFallback>,
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Apply the overrides of a named destination.
    ///
    /// A config without any destinations accepts every name unchanged, so
    /// single-site setups don't need an empty `destinations` block.
    pub fn for_destination(&self, name: &str) -> Result<Config> {
        if self.destinations.is_empty() {
            return Ok(self.clone());
        }

        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref proxy) = dest.proxy {
            merged.proxy = proxy.clone();
        }

        if let Some(ref environments) = dest.environments {
            merged.environments = environments.clone();
        }

        // Deep merge env
        for (k, v) in &dest.env {
            merged.env.insert(k.clone(), v.clone());
        }

        if let Some(ref steps) = dest.steps {
            merged.steps = steps.clone();
        }

        if dest.notify.is_some() {
            merged.notify = dest.notify.clone();
        }

        if dest.lock_dir.is_some() {
            merged.lock_dir = dest.lock_dir.clone();
        }

        if let Some(fallback) = dest.detection_fallback {
            merged.detection_fallback = fallback;
        }

        merged.validate()?;
        Ok(merged)
    }

    fn validate(&self) -> Result<()> {
        for probe in [&self.health, &self.rollback_health] {
            if probe.interval.is_zero() || probe.timeout.is_zero() {
                return Err(Error::InvalidConfig(
                    "health timeout and interval must be greater than zero".to_string(),
                ));
            }
        }

        if self.smoke.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "smoke concurrency must be at least 1".to_string(),
            ));
        }

        if let Some(ref name) = self.smoke.service
            && self.service(name).is_none()
        {
            return Err(Error::InvalidConfig(format!(
                "smoke service '{}' is not a configured service",
                name
            )));
        }

        if self.environments.blue.host == self.environments.green.host {
            for service in &self.services {
                if service.ports.blue == service.ports.green {
                    return Err(Error::InvalidConfig(format!(
                        "service '{}' uses port {} for both blue and green",
                        service.name, service.ports.blue
                    )));
                }
            }
        }

        if let Some(key) = self.env.keys().find(|k| k.starts_with(RESERVED_PREFIX)) {
            return Err(Error::InvalidConfig(format!(
                "env key '{}' uses the reserved {} prefix",
                key, RESERVED_PREFIX
            )));
        }

        if let Some(ref url) = self.proxy.health_url
            && HealthCheckTarget::from_url("proxy", url, 200).is_none()
        {
            return Err(Error::InvalidConfig(format!(
                "proxy health_url is not a valid http URL: {}",
                url
            )));
        }

        Ok(())
    }

    pub fn service(&self, name: &ServiceName) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| &s.name == name)
    }

    /// Services covered by a deployment target.
    pub fn select_services(&self, target: &ServiceTarget) -> Result<Vec<&ServiceConfig>> {
        if let ServiceTarget::Only(name) = target
            && self.service(name).is_none()
        {
            return Err(Error::InvalidArgument(format!("unknown service: {}", name)));
        }

        Ok(self
            .services
            .iter()
            .filter(|s| target.includes(&s.name))
            .collect())
    }

    /// Base URL of a service in a given slot.
    pub fn service_url(&self, service: &ServiceConfig, env: Environment) -> String {
        format!(
            "http://{}:{}",
            self.environments.get(env).host,
            service.ports.for_env(env)
        )
    }

    /// Readiness targets for the selected services in one slot.
    pub fn health_targets(
        &self,
        env: Environment,
        target: &ServiceTarget,
    ) -> Result<Vec<HealthCheckTarget>> {
        let host = &self.environments.get(env).host;
        Ok(self
            .select_services(target)?
            .into_iter()
            .map(|s| HealthCheckTarget {
                name: s.name.to_string(),
                host: host.clone(),
                port: s.ports.for_env(env),
                endpoint: s.health.clone(),
                expected: s.expect,
            })
            .collect())
    }

    /// The proxy's own health endpoint, when configured.
    pub fn proxy_health_target(&self) -> Option<HealthCheckTarget> {
        self.proxy
            .health_url
            .as_deref()
            .and_then(|url| HealthCheckTarget::from_url("proxy", url, 200))
    }

    pub fn smoke_service(&self) -> &ServiceConfig {
        self.smoke
            .service
            .as_ref()
            .and_then(|name| self.service(name))
            .unwrap_or_else(|| self.services.first())
    }

    pub fn smoke_base_url(&self, env: Environment) -> String {
        self.service_url(self.smoke_service(), env)
    }

    /// The configured battery, or a single health check when none is configured.
    pub fn smoke_assertions(&self) -> Vec<SmokeAssertion> {
        if !self.smoke.assertions.is_empty() {
            return self.smoke.assertions.clone();
        }

        let service = self.smoke_service();
        vec![SmokeAssertion::get(
            format!("{} health", service.name),
            service.health.clone(),
            service.expect,
        )]
    }

    /// Directory holding the deploy lock.
    /// Uses configured dir or falls back to the XDG state directory.
    pub fn lock_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.lock_dir {
            return dir.clone();
        }

        let state_home = std::env::var_os("XDG_STATE_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/state")))
            .unwrap_or_else(std::env::temp_dir);

        state_home.join("cutover")
    }

    pub fn template() -> Self {
        let mut services = NonEmpty::new(ServiceConfig {
            name: ServiceName::new("web").expect("template service name is valid"),
            health: "/health/".to_string(),
            expect: 200,
            ports: SlotPorts {
                blue: 8001,
                green: 8002,
            },
        });
        services.push(ServiceConfig {
            name: ServiceName::new("gateway").expect("template service name is valid"),
            health: "/health".to_string(),
            expect: 200,
            ports: SlotPorts {
                blue: 9001,
                green: 9002,
            },
        });

        Config {
            project: ServiceName::new("my-app").expect("template project name is valid"),
            proxy: ProxyConfig::new("/etc/nginx/conf.d/upstream.conf"),
            environments: EnvironmentsConfig::default(),
            services,
            health: ProbeConfig::default(),
            rollback_health: ProbeConfig::reduced(),
            smoke: SmokeConfig::default(),
            steps: StepsConfig::new(
                "docker compose -p \"$CUTOVER_PROJECT-$CUTOVER_SLOT\" up -d $CUTOVER_SERVICES",
            ),
            env: HashMap::new(),
            runtime: RuntimeConfig::default(),
            lock_dir: None,
            detection_fallback: DetectionFallback::default(),
            notify: None,
            destinations: HashMap::new(),
        }
    }
}
