// ABOUTME: HTTP health prober polling every target in parallel on a fixed schedule.
// ABOUTME: Attempt i starts at start + i*interval; the interval loop is the only retry.

use async_trait::async_trait;
use tokio::time::Instant;

use super::{HealthCheckResult, HealthCheckTarget, HealthProbe};
use crate::cancel::Cancellation;
use crate::config::ProbeConfig;
use crate::http::{HttpClient, HttpRequest};

/// Number of attempts that fit in the budget: ceil(timeout / interval), at least one.
pub fn attempt_budget(config: &ProbeConfig) -> u32 {
    let interval = config.interval.as_nanos().max(1);
    let attempts = config.timeout.as_nanos().div_ceil(interval).max(1);
    u32::try_from(attempts).unwrap_or(u32::MAX)
}

pub struct HealthProber<C> {
    client: C,
}

impl<C: HttpClient> HealthProber<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    async fn probe_one(
        &self,
        target: &HealthCheckTarget,
        config: &ProbeConfig,
        cancel: &Cancellation,
    ) -> HealthCheckResult {
        let start = Instant::now();
        let budget = attempt_budget(config);
        let url = target.url();
        let mut attempts = 0;
        let mut last_error = None;

        for i in 0..budget {
            if i > 0 && !cancel.sleep_until(start + config.interval * i).await {
                break;
            }
            if cancel.is_cancelled() {
                break;
            }

            let remaining = config.timeout.saturating_sub(start.elapsed());
            let per_attempt = config.interval.min(remaining);
            if per_attempt.is_zero() {
                break;
            }

            attempts += 1;
            let request = HttpRequest::get(url.clone(), per_attempt);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                r = tokio::time::timeout(per_attempt, self.client.send(request)) => r,
            };

            match outcome {
                Ok(Ok(response)) if response.status == target.expected => {
                    tracing::debug!(
                        target = %target.name,
                        attempts,
                        "healthy at {}",
                        url
                    );
                    return HealthCheckResult {
                        target: target.clone(),
                        healthy: true,
                        attempts,
                        elapsed: start.elapsed(),
                        last_error: None,
                    };
                }
                Ok(Ok(response)) => {
                    last_error = Some(format!(
                        "status {} (expected {})",
                        response.status, target.expected
                    ));
                }
                Ok(Err(e)) => last_error = Some(e.to_string()),
                Err(_) => last_error = Some(format!("timed out after {:?}", per_attempt)),
            }

            tracing::debug!(
                target = %target.name,
                attempt = attempts,
                "not ready: {}",
                last_error.as_deref().unwrap_or_default()
            );
        }

        if cancel.is_cancelled() {
            last_error = Some("cancelled".to_string());
        }

        tracing::warn!(
            target = %target.name,
            attempts,
            "{} did not become healthy: {}",
            url,
            last_error.as_deref().unwrap_or("no attempt made")
        );

        HealthCheckResult {
            target: target.clone(),
            healthy: false,
            attempts,
            elapsed: start.elapsed(),
            last_error,
        }
    }
}

#[async_trait]
impl<C: HttpClient> HealthProbe for HealthProber<C> {
    async fn probe(
        &self,
        targets: &[HealthCheckTarget],
        config: &ProbeConfig,
        cancel: &Cancellation,
    ) -> Vec<HealthCheckResult> {
        tracing::info!(
            targets = targets.len(),
            timeout = ?config.timeout,
            interval = ?config.interval,
            "probing health"
        );
        futures::future::join_all(targets.iter().map(|t| self.probe_one(t, config, cancel))).await
    }
}
