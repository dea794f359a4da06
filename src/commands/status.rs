// ABOUTME: Status command implementation.
// ABOUTME: Reports the active environment and one health probe of each environment.

use serde::Serialize;
use std::sync::Arc;

use cutover::cancel::Cancellation;
use cutover::config::{Config, ProbeConfig};
use cutover::error::Result;
use cutover::health::{HealthCheckResult, HealthProbe, HealthProber};
use cutover::http::HyperClient;
use cutover::output::{Output, OutputMode};
use cutover::proxy::{CommandProxy, FileUpstreamStore, TrafficSwitch, TrafficSwitcher};
use cutover::types::{Environment, ServiceTarget};

#[derive(Serialize)]
struct StatusReport {
    project: String,
    active: Environment,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<String>,
    environments: Vec<EnvironmentStatus>,
}

#[derive(Serialize)]
struct EnvironmentStatus {
    environment: Environment,
    live: bool,
    results: Vec<HealthCheckResult>,
}

/// Print the live environment and the health of both. Read-only.
pub async fn status(config: Config, output: Output, cancel: &Cancellation) -> Result<i32> {
    let store = Arc::new(FileUpstreamStore::new(&config.proxy.config));
    let proxy = Arc::new(CommandProxy::new(config.proxy.clone()));
    let switcher = TrafficSwitcher::new(store, proxy, config.detection_fallback);
    let detection = switcher.detect().await?;

    // One attempt per target
    let once = ProbeConfig {
        timeout: config.health.interval,
        interval: config.health.interval,
    };
    let prober = HealthProber::new(HyperClient::new());

    let mut environments = Vec::new();
    for env in Environment::ALL {
        let mut targets = config.health_targets(env, &ServiceTarget::All)?;
        if env == detection.state.active {
            targets.extend(config.proxy_health_target());
        }
        let results = prober.probe(&targets, &once, cancel).await;
        environments.push(EnvironmentStatus {
            environment: env,
            live: env == detection.state.active,
            results,
        });
    }

    let report = StatusReport {
        project: config.project.to_string(),
        active: detection.state.active,
        fallback: detection.ambiguity.as_ref().map(|a| a.to_string()),
        environments,
    };

    if output.mode() == OutputMode::Json {
        if let Ok(json) = serde_json::to_string(&report) {
            println!("{json}");
        }
        return Ok(0);
    }

    match report.fallback {
        Some(ref ambiguity) => println!(
            "{}: {} active (assumed: {})",
            report.project, report.active, ambiguity
        ),
        None => println!("{}: {} active", report.project, report.active),
    }
    for env in &report.environments {
        let marker = if env.live { " (live)" } else { "" };
        println!("{}{}", env.environment, marker);
        for result in &env.results {
            let state = if result.healthy { "healthy" } else { "unhealthy" };
            match result.last_error {
                Some(ref error) if !result.healthy => {
                    println!("  {} {}: {} ({})", result.target.name, result.target.url(), state, error)
                }
                _ => println!("  {} {}: {}", result.target.name, result.target.url(), state),
            }
        }
    }

    Ok(0)
}
