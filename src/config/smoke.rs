// ABOUTME: Smoke test battery configuration.
// ABOUTME: Which service hosts the battery, the per-assertion timeout, and the assertions.

use serde::Deserialize;
use std::time::Duration;

use super::deserialize::deserialize_service_name_option;
use crate::smoke::SmokeAssertion;
use crate::types::ServiceName;

#[derive(Debug, Clone, Deserialize)]
pub struct SmokeConfig {
    /// Service whose slot URL is the battery's base URL. Defaults to the first service.
    #[serde(default, deserialize_with = "deserialize_service_name_option")]
    pub service: Option<ServiceName>,

    /// Per-assertion timeout.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum assertions in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// When empty, the battery is a single check of the service's health endpoint.
    #[serde(default)]
    pub assertions: Vec<SmokeAssertion>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_concurrency() -> usize {
    4
}

impl Default for SmokeConfig {
    fn default() -> Self {
        SmokeConfig {
            service: None,
            timeout: default_timeout(),
            concurrency: default_concurrency(),
            assertions: Vec::new(),
        }
    }
}
