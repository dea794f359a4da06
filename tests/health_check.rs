// ABOUTME: Integration tests for the HTTP health prober.
// ABOUTME: Attempt budgets under paused time, plus real requests against a local stub.

mod support;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use cutover::cancel::Cancellation;
use cutover::config::ProbeConfig;
use cutover::health::{HealthCheckTarget, HealthProbe, HealthProber};
use cutover::http::{HttpClient, HttpError, HttpRequest, HttpResponse, HyperClient};
use support::{HttpStub, init_tracing};

fn probe_config(timeout: u64, interval: u64) -> ProbeConfig {
    ProbeConfig {
        timeout: Duration::from_secs(timeout),
        interval: Duration::from_secs(interval),
    }
}

fn target(name: &str, port: u16) -> HealthCheckTarget {
    HealthCheckTarget {
        name: name.to_string(),
        host: "127.0.0.1".to_string(),
        port,
        endpoint: "/health/".to_string(),
        expected: 200,
    }
}

/// Never answers.
struct SilentClient;

#[async_trait]
impl HttpClient for SilentClient {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
        std::future::pending().await
    }
}

/// Answers with scripted status codes, 200 once the script runs out.
struct ScriptedClient {
    statuses: Mutex<VecDeque<u16>>,
}

impl ScriptedClient {
    fn new(statuses: &[u16]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let status = self.statuses.lock().pop_front().unwrap_or(200);
        Ok(HttpResponse {
            status,
            elapsed: Duration::from_millis(5),
            body: Default::default(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn unresponsive_target_uses_whole_budget() {
    init_tracing();
    let prober = HealthProber::new(SilentClient);

    let started = tokio::time::Instant::now();
    let results = prober
        .probe(&[target("web", 8002)], &probe_config(10, 2), &Cancellation::never())
        .await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].healthy);
    assert_eq!(results[0].attempts, 5);
    assert!(results[0].last_error.as_deref().unwrap().contains("timed out"));
    assert!(started.elapsed() <= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn target_becomes_healthy_after_retries() {
    init_tracing();
    let prober = HealthProber::new(ScriptedClient::new(&[503, 503]));

    let results = prober
        .probe(&[target("web", 8002)], &probe_config(10, 2), &Cancellation::never())
        .await;

    assert!(results[0].healthy);
    assert_eq!(results[0].attempts, 3);
    assert!(results[0].last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn wrong_status_is_reported() {
    init_tracing();
    let prober = HealthProber::new(ScriptedClient::new(&[500; 10]));

    let results = prober
        .probe(&[target("web", 8002)], &probe_config(4, 2), &Cancellation::never())
        .await;

    assert!(!results[0].healthy);
    assert_eq!(results[0].attempts, 2);
    assert_eq!(
        results[0].last_error.as_deref(),
        Some("status 500 (expected 200)")
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_probing() {
    init_tracing();
    let prober = HealthProber::new(SilentClient);
    let (handle, cancel) = Cancellation::pair();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.cancel();
    });

    let started = tokio::time::Instant::now();
    let results = prober
        .probe(&[target("web", 8002)], &probe_config(120, 2), &cancel)
        .await;

    assert!(!results[0].healthy);
    assert_eq!(results[0].last_error.as_deref(), Some("cancelled"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn healthy_stub_passes_on_first_attempt() {
    init_tracing();
    let stub = HttpStub::start(&[("/health/", 200)]).await;
    let prober = HealthProber::new(HyperClient::new());

    let results = prober
        .probe(
            &[target("web", stub.port())],
            &probe_config(5, 1),
            &Cancellation::never(),
        )
        .await;

    assert!(results[0].healthy, "{:?}", results[0].last_error);
    assert_eq!(results[0].attempts, 1);
    assert_eq!(stub.hits(), vec!["/health/".to_string()]);
}

#[tokio::test]
async fn targets_are_probed_independently() {
    init_tracing();
    let healthy = HttpStub::start(&[("/health/", 200)]).await;
    let broken = HttpStub::start(&[("/health/", 503)]).await;
    let prober = HealthProber::new(HyperClient::new());

    let results = prober
        .probe(
            &[target("api", healthy.port()), target("worker", broken.port())],
            &probe_config(2, 1),
            &Cancellation::never(),
        )
        .await;

    assert!(results[0].healthy);
    assert!(!results[1].healthy);
    assert_eq!(cutover::health::unhealthy_targets(&results), vec!["worker"]);
}
