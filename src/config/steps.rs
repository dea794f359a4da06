// ABOUTME: Opaque deployment step commands (pull, migrate, deploy, publish, cleanup).
// ABOUTME: Each is a shell string run with the deployment context in its environment.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct StepsConfig {
    #[serde(default)]
    pub pull: Option<String>,

    #[serde(default)]
    pub migrate: Option<String>,

    /// Starts or updates the target slot. Required.
    pub deploy: String,

    #[serde(default)]
    pub publish: Option<String>,

    #[serde(default)]
    pub cleanup: Option<String>,

    /// Upper bound for any single step.
    #[serde(default = "default_step_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_step_timeout() -> Duration {
    Duration::from_secs(600)
}

impl StepsConfig {
    pub fn new(deploy: impl Into<String>) -> Self {
        StepsConfig {
            pull: None,
            migrate: None,
            deploy: deploy.into(),
            publish: None,
            cleanup: None,
            timeout: default_step_timeout(),
        }
    }
}
