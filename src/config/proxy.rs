// ABOUTME: Reverse proxy configuration: upstream file location and control commands.
// ABOUTME: Commands are shell strings whose exit status is the result.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Upstream configuration file holding the blue/green entries.
    pub config: PathBuf,

    #[serde(default = "default_validate")]
    pub validate: String,

    #[serde(default = "default_reload")]
    pub reload: String,

    #[serde(default = "default_status")]
    pub status: String,

    /// The proxy's own health endpoint, probed after a switch.
    #[serde(default)]
    pub health_url: Option<String>,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

fn default_validate() -> String {
    "nginx -t".to_string()
}

fn default_reload() -> String {
    "nginx -s reload".to_string()
}

fn default_status() -> String {
    "pgrep -x nginx".to_string()
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}

impl ProxyConfig {
    pub fn new(config: impl Into<PathBuf>) -> Self {
        ProxyConfig {
            config: config.into(),
            validate: default_validate(),
            reload: default_reload(),
            status: default_status(),
            health_url: None,
            command_timeout: default_command_timeout(),
        }
    }
}
