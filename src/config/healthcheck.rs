// ABOUTME: Health probing budgets for the health gate and rollback pass.
// ABOUTME: Defines timeout and polling interval with sensible defaults.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            timeout: default_timeout(),
            interval: default_interval(),
        }
    }
}

impl ProbeConfig {
    /// The shorter budget used to confirm recovery after a rollback.
    pub fn reduced() -> Self {
        ProbeConfig {
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(2),
        }
    }
}
