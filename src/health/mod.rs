// ABOUTME: Health prober types: targets, per-target results, and the probe trait.
// ABOUTME: Polling on a fixed interval until expected status or the timeout elapses.

mod prober;

pub use prober::{HealthProber, attempt_budget};

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::cancel::Cancellation;
use crate::config::ProbeConfig;
use crate::http::join_url;

/// One readiness endpoint to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub endpoint: String,
    pub expected: u16,
}

impl HealthCheckTarget {
    pub fn url(&self) -> String {
        join_url(&format!("http://{}:{}", self.host, self.port), &self.endpoint)
    }

    /// Build a target from an absolute `http://` URL. Returns None for
    /// anything else.
    pub fn from_url(name: impl Into<String>, url: &str, expected: u16) -> Option<Self> {
        let uri: hyper::Uri = url.parse().ok()?;
        if uri.scheme_str() != Some("http") {
            return None;
        }
        let host = uri.host()?.to_string();
        let endpoint = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "/".to_string());

        Some(HealthCheckTarget {
            name: name.into(),
            host,
            port: uri.port_u16().unwrap_or(80),
            endpoint,
            expected,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub target: HealthCheckTarget,
    pub healthy: bool,
    pub attempts: u32,
    #[serde(skip)]
    pub elapsed: Duration,
    /// Why the last attempt failed, for unhealthy results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// True when every result is healthy. An empty set is vacuously healthy.
pub fn all_healthy(results: &[HealthCheckResult]) -> bool {
    results.iter().all(|r| r.healthy)
}

/// Names of the targets that never became healthy.
pub fn unhealthy_targets(results: &[HealthCheckResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| !r.healthy)
        .map(|r| r.target.name.clone())
        .collect()
}

/// Polls targets independently; one unhealthy target never stops the others.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(
        &self,
        targets: &[HealthCheckTarget],
        config: &ProbeConfig,
        cancel: &Cancellation,
    ) -> Vec<HealthCheckResult>;
}
