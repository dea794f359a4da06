// ABOUTME: Smoke runner tests against a local HTTP stub.
// ABOUTME: Status sets, hard failures, latency warnings, and result ordering.

mod support;

use std::time::Duration;

use cutover::cancel::Cancellation;
use cutover::http::HyperClient;
use cutover::smoke::{ExpectedStatus, SmokeAssertion, SmokeRunner, SmokeTest};
use support::{HttpStub, init_tracing};

fn runner() -> SmokeRunner<HyperClient> {
    init_tracing();
    SmokeRunner::new(HyperClient::new(), Duration::from_secs(5), 4)
}

#[tokio::test]
async fn status_sets_accept_auth_challenges() {
    let stub = HttpStub::start(&[("/health", 200), ("/api/products/", 401)]).await;
    let assertions = vec![
        SmokeAssertion::get("health", "/health", 200),
        SmokeAssertion::get(
            "products",
            "/api/products/",
            ExpectedStatus::AnyOf(vec![200, 401, 403]),
        ),
    ];

    let result = runner()
        .run(&stub.base_url(), &assertions, &Cancellation::never())
        .await;

    assert_eq!(result.passed, 2);
    assert_eq!(result.failed, 0);
    assert!(result.verdict());
    assert_eq!(result.assertions[1].actual_status, Some(401));
}

#[tokio::test]
async fn status_mismatch_fails_the_battery() {
    let stub = HttpStub::start(&[("/health", 200), ("/checkout", 500)]).await;
    let assertions = vec![
        SmokeAssertion::get("health", "/health", 200),
        SmokeAssertion::get("checkout", "/checkout", 200),
    ];

    let result = runner()
        .run(&stub.base_url(), &assertions, &Cancellation::never())
        .await;

    assert!(!result.verdict());
    assert_eq!(result.passed, 1);
    assert_eq!(result.failed, 1);
    let failures: Vec<_> = result.failures().map(|a| a.name.as_str()).collect();
    assert_eq!(failures, vec!["checkout"]);
}

#[tokio::test]
async fn slow_response_only_warns() {
    let stub =
        HttpStub::start_with_delay(&[("/health", 200)], Duration::from_millis(150)).await;
    let assertions = vec![
        SmokeAssertion::get("health", "/health", 200).with_max_latency(Duration::from_millis(10)),
    ];

    let result = runner()
        .run(&stub.base_url(), &assertions, &Cancellation::never())
        .await;

    assert!(result.verdict());
    let warnings: Vec<_> = result.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].0, "health");
    assert!(warnings[0].1.contains("ceiling"));
}

#[tokio::test]
async fn unreachable_base_url_fails_every_assertion() {
    let runner = runner();
    // Bind then drop a listener to get a port with nothing behind it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let assertions = vec![SmokeAssertion::get("health", "/health", 200)];

    let result = runner
        .run(
            &format!("http://127.0.0.1:{}", port),
            &assertions,
            &Cancellation::never(),
        )
        .await;

    assert_eq!(result.failed, 1);
    assert!(result.assertions[0].actual_status.is_none());
    assert!(result.assertions[0].error.is_some());
}

#[tokio::test]
async fn results_keep_assertion_order() {
    let routes: Vec<(String, u16)> = (0..8).map(|i| (format!("/r{}", i), 200)).collect();
    let routes: Vec<(&str, u16)> = routes.iter().map(|(p, s)| (p.as_str(), *s)).collect();
    let stub = HttpStub::start(&routes).await;
    let assertions: Vec<_> = (0..8)
        .map(|i| SmokeAssertion::get(format!("r{}", i), format!("/r{}", i), 200))
        .collect();

    let result = SmokeRunner::new(HyperClient::new(), Duration::from_secs(5), 3)
        .run(&stub.base_url(), &assertions, &Cancellation::never())
        .await;

    let names: Vec<_> = result.assertions.iter().map(|a| a.name.clone()).collect();
    let expected: Vec<_> = (0..8).map(|i| format!("r{}", i)).collect();
    assert_eq!(names, expected);
}
