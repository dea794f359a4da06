// ABOUTME: Per-service configuration: health endpoint and slot ports.
// ABOUTME: Each service listens on a different port in the blue and green slots.

use serde::Deserialize;

use super::deserialize::deserialize_service_name;
use crate::types::{Environment, ServiceName};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(deserialize_with = "deserialize_service_name")]
    pub name: ServiceName,

    /// Readiness endpoint path.
    #[serde(default = "default_health_path")]
    pub health: String,

    /// Status code that means ready.
    #[serde(default = "default_expect")]
    pub expect: u16,

    pub ports: SlotPorts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SlotPorts {
    pub blue: u16,
    pub green: u16,
}

impl SlotPorts {
    pub fn for_env(&self, env: Environment) -> u16 {
        match env {
            Environment::Blue => self.blue,
            Environment::Green => self.green,
        }
    }
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_expect() -> u16 {
    200
}

/// Host each slot's services listen on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentsConfig {
    #[serde(default)]
    pub blue: EnvironmentConfig,
    #[serde(default)]
    pub green: EnvironmentConfig,
}

impl EnvironmentsConfig {
    pub fn get(&self, env: Environment) -> &EnvironmentConfig {
        match env {
            Environment::Blue => &self.blue,
            Environment::Green => &self.green,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            host: default_host(),
        }
    }
}
