// ABOUTME: Smoke runner executing each assertion once with bounded concurrency.
// ABOUTME: Results keep assertion order; a per-assertion timeout bounds the whole run.

use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;

use super::{SmokeAssertion, SmokeAssertionResult, SmokeTest, SmokeTestResult};
use crate::cancel::Cancellation;
use crate::http::{HttpClient, HttpRequest, join_url};

pub struct SmokeRunner<C> {
    client: C,
    timeout: Duration,
    concurrency: usize,
}

impl<C: HttpClient> SmokeRunner<C> {
    pub fn new(client: C, timeout: Duration, concurrency: usize) -> Self {
        Self {
            client,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    async fn run_one(
        &self,
        base_url: &str,
        assertion: &SmokeAssertion,
        cancel: &Cancellation,
    ) -> SmokeAssertionResult {
        let name = assertion.label();
        let request = HttpRequest {
            method: assertion.method,
            url: join_url(base_url, &assertion.path),
            body: None,
            content_type: None,
            timeout: self.timeout,
        };

        tracing::debug!(assertion = %name, url = %request.url, "running smoke assertion");

        // The client enforces the timeout too; this guards doubles that don't.
        let response = tokio::select! {
            _ = cancel.cancelled() => Err("cancelled".to_string()),
            r = tokio::time::timeout(self.timeout, self.client.send(request)) => match r {
                Ok(inner) => inner.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {:?}", self.timeout)),
            },
        };

        match response {
            Ok(response) => {
                let pass = assertion.expect.matches(response.status);
                let warning = assertion
                    .max_latency
                    .filter(|max| response.elapsed > *max)
                    .map(|max| {
                        format!(
                            "responded in {}ms, over the {}ms ceiling",
                            response.elapsed.as_millis(),
                            max.as_millis()
                        )
                    });

                if let Some(ref w) = warning {
                    tracing::warn!(assertion = %name, "{}", w);
                }
                if !pass {
                    tracing::warn!(
                        assertion = %name,
                        "expected {}, got {}",
                        assertion.expect,
                        response.status
                    );
                }

                SmokeAssertionResult {
                    name,
                    expected: assertion.expect.clone(),
                    actual_status: Some(response.status),
                    pass,
                    latency: Some(response.elapsed),
                    warning,
                    error: None,
                }
            }
            Err(error) => {
                tracing::warn!(assertion = %name, "no response: {}", error);
                SmokeAssertionResult {
                    name,
                    expected: assertion.expect.clone(),
                    actual_status: None,
                    pass: false,
                    latency: None,
                    warning: None,
                    error: Some(error),
                }
            }
        }
    }
}

#[async_trait]
impl<C: HttpClient> SmokeTest for SmokeRunner<C> {
    async fn run(
        &self,
        base_url: &str,
        assertions: &[SmokeAssertion],
        cancel: &Cancellation,
    ) -> SmokeTestResult {
        let checks: Vec<_> = assertions
            .iter()
            .map(|a| self.run_one(base_url, a, cancel))
            .collect();
        // buffered() keeps results in input order
        let results: Vec<SmokeAssertionResult> = futures::stream::iter(checks)
            .buffered(self.concurrency)
            .collect()
            .await;

        let result = SmokeTestResult::from_assertions(results);
        tracing::info!(
            passed = result.passed,
            failed = result.failed,
            "smoke battery finished against {}",
            base_url
        );
        result
    }
}
