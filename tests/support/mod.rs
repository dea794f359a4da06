// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup, a raw TCP HTTP stub, and fake collaborators for the orchestrator.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cutover::cancel::{CancelHandle, Cancellation};
use cutover::config::{Config, ProbeConfig};
use cutover::deploy::{Ports, RollbackController};
use cutover::health::{HealthCheckResult, HealthCheckTarget, HealthProbe};
use cutover::notify::{DeploymentEvent, Notifier, NotifyError};
use cutover::proxy::{
    DetectionFallback, MemoryUpstreamStore, ProxyControl, ProxyError, TrafficSwitch,
    TrafficSwitcher,
};
use cutover::runtime::{RuntimeEndpoint, RuntimeError, RuntimeKind, RuntimeProbe};
use cutover::runtime::DetectionError;
use cutover::services::{ServiceControl, ServiceError, Step};
use cutover::smoke::{SmokeAssertion, SmokeTest, SmokeTestResult};
use cutover::types::{Environment, ServiceTarget, Version};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("cutover=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const BLUE_ACTIVE: &str = "upstream backend {
    server 127.0.0.1:8001;  # blue [active]
    server 127.0.0.1:8002 down;  # green
}
";

pub const GREEN_ACTIVE: &str = "upstream backend {
    server 127.0.0.1:8001 down;  # blue
    server 127.0.0.1:8002;  # green [active]
}
";

/// Config with one service (web, 8001/8002), a proxy health URL, and the lock in `lock_dir`.
pub fn test_config(lock_dir: &Path) -> Config {
    let yaml = format!(
        r#"
project: shop
proxy:
  config: /unused/upstream.conf
  health_url: http://127.0.0.1:8080/nginx-health
services:
  - name: web
    health: /health/
    ports: {{ blue: 8001, green: 8002 }}
health: {{ timeout: 10s, interval: 2s }}
rollback_health: {{ timeout: 4s, interval: 2s }}
steps:
  deploy: "true"
lock_dir: {}
"#,
        lock_dir.display()
    );
    Config::from_yaml(&yaml).unwrap()
}

// =============================================================================
// HTTP stub
// =============================================================================

/// Serves canned status codes by path over plain TCP. Unknown paths get 404.
pub struct HttpStub {
    addr: SocketAddr,
    hits: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl HttpStub {
    pub async fn start(routes: &[(&str, u16)]) -> Self {
        Self::start_with_delay(routes, Duration::ZERO).await
    }

    /// Every response waits `delay` before it is written.
    pub async fn start_with_delay(routes: &[(&str, u16)], delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Arc<HashMap<String, u16>> = Arc::new(
            routes
                .iter()
                .map(|(path, status)| (path.to_string(), *status))
                .collect(),
        );
        let hits = Arc::new(Mutex::new(Vec::new()));
        let bodies = Arc::new(Mutex::new(Vec::new()));

        let hits_task = hits.clone();
        let bodies_task = bodies.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                let hits = hits_task.clone();
                let bodies = bodies_task.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let header_end = buf.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
                    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                    let path = head
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/")
                        .to_string();
                    let length = head
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    // Drain the body so closing the socket doesn't reset the connection
                    let mut body = buf[header_end..].to_vec();
                    while body.len() < length {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => body.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let status = routes.get(&path).copied().unwrap_or(404);
                    hits.lock().push(path);
                    bodies.lock().push(String::from_utf8_lossy(&body).to_string());

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                        status
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr, hits, bodies }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().clone()
    }

    /// Request bodies in arrival order.
    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().clone()
    }
}

// =============================================================================
// Fakes
// =============================================================================

pub struct FakeRuntime {
    pub reachable: bool,
}

#[async_trait]
impl RuntimeProbe for FakeRuntime {
    async fn ping(&self) -> Result<RuntimeEndpoint, RuntimeError> {
        if self.reachable {
            Ok(RuntimeEndpoint::new(RuntimeKind::Docker, "/fake/docker.sock"))
        } else {
            Err(DetectionError::NoRuntimeFound.into())
        }
    }
}

/// Proxy double. Reloads fail while `reload_failures` is above zero.
#[derive(Default)]
pub struct FakeProxy {
    pub stopped: bool,
    pub reject_config: bool,
    pub reload_failures: AtomicUsize,
    pub reloads: AtomicUsize,
    pub validations: AtomicUsize,
}

impl FakeProxy {
    pub fn failing_reloads(count: usize) -> Self {
        Self {
            reload_failures: AtomicUsize::new(count),
            ..Default::default()
        }
    }

    fn failure(command: &str) -> ProxyError {
        ProxyError::Failed {
            command: command.to_string(),
            status: "exit status 1".to_string(),
            stderr: "simulated failure".to_string(),
        }
    }
}

#[async_trait]
impl ProxyControl for FakeProxy {
    async fn is_running(&self) -> Result<bool, ProxyError> {
        Ok(!self.stopped)
    }

    async fn validate(&self) -> Result<(), ProxyError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        if self.reject_config {
            return Err(Self::failure("nginx -t"));
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), ProxyError> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .reload_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Self::failure("nginx -s reload"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeServices {
    pub fail_step: Option<Step>,
    pub deploys: Mutex<Vec<(Environment, String, ServiceTarget)>>,
    pub cleanups: Mutex<Vec<Environment>>,
}

impl FakeServices {
    pub fn deploy_count(&self) -> usize {
        self.deploys.lock().len()
    }
}

#[async_trait]
impl ServiceControl for FakeServices {
    async fn deploy(
        &self,
        slot: Environment,
        version: &Version,
        target: &ServiceTarget,
    ) -> Result<(), ServiceError> {
        if let Some(step) = self.fail_step {
            return Err(ServiceError::StepFailed {
                step,
                status: "exit status 1".to_string(),
                stderr: "simulated failure".to_string(),
            });
        }
        self.deploys
            .lock()
            .push((slot, version.to_string(), target.clone()));
        Ok(())
    }

    async fn cleanup(&self, slot: Environment) -> Result<(), ServiceError> {
        self.cleanups.lock().push(slot);
        Ok(())
    }
}

/// Prober double. Each probe() call takes the next scripted verdict; healthy once the script runs out.
#[derive(Default)]
pub struct FakeProber {
    script: Mutex<VecDeque<bool>>,
    pub calls: Mutex<Vec<Vec<HealthCheckTarget>>>,
    /// Trip this handle while serving the given call (0-based).
    cancel_on: Option<(usize, CancelHandle)>,
}

impl FakeProber {
    pub fn scripted(verdicts: &[bool]) -> Self {
        Self {
            script: Mutex::new(verdicts.iter().copied().collect()),
            ..Default::default()
        }
    }

    pub fn cancelling_on_call(call: usize, handle: CancelHandle) -> Self {
        Self {
            cancel_on: Some((call, handle)),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn probed_ports(&self, call: usize) -> Vec<u16> {
        self.calls.lock()[call].iter().map(|t| t.port).collect()
    }
}

#[async_trait]
impl HealthProbe for FakeProber {
    async fn probe(
        &self,
        targets: &[HealthCheckTarget],
        _config: &ProbeConfig,
        _cancel: &Cancellation,
    ) -> Vec<HealthCheckResult> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(targets.to_vec());
            calls.len() - 1
        };
        if let Some((at, handle)) = &self.cancel_on
            && *at == call
        {
            handle.cancel();
        }
        let healthy = self.script.lock().pop_front().unwrap_or(true);
        targets
            .iter()
            .map(|target| HealthCheckResult {
                target: target.clone(),
                healthy,
                attempts: 1,
                elapsed: Duration::ZERO,
                last_error: (!healthy).then(|| "status 503".to_string()),
            })
            .collect()
    }
}

/// Smoke double that counts runs.
#[derive(Default)]
pub struct CountingSmoke {
    pub fail: bool,
    pub runs: AtomicUsize,
    pub base_urls: Mutex<Vec<String>>,
}

impl CountingSmoke {
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmokeTest for CountingSmoke {
    async fn run(
        &self,
        base_url: &str,
        assertions: &[SmokeAssertion],
        _cancel: &Cancellation,
    ) -> SmokeTestResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.base_urls.lock().push(base_url.to_string());
        let failed = if self.fail { assertions.len() } else { 0 };
        SmokeTestResult {
            passed: assertions.len() - failed,
            failed,
            assertions: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<DeploymentEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &DeploymentEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Fakes wired together around an in-memory upstream file and the real switcher.
pub struct Harness {
    pub config: Config,
    pub store: Arc<MemoryUpstreamStore>,
    pub proxy: Arc<FakeProxy>,
    pub services: Arc<FakeServices>,
    pub prober: Arc<FakeProber>,
    pub smoke: Arc<CountingSmoke>,
    pub notifier: Arc<RecordingNotifier>,
    pub runtime_reachable: bool,
}

impl Harness {
    pub fn new(config: Config, upstream: &str) -> Self {
        Self {
            config,
            store: Arc::new(MemoryUpstreamStore::new(upstream)),
            proxy: Arc::new(FakeProxy::default()),
            services: Arc::new(FakeServices::default()),
            prober: Arc::new(FakeProber::default()),
            smoke: Arc::new(CountingSmoke::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            runtime_reachable: true,
        }
    }

    pub fn ports(&self) -> Ports {
        let switcher: Arc<dyn TrafficSwitch> = Arc::new(TrafficSwitcher::new(
            self.store.clone(),
            self.proxy.clone(),
            DetectionFallback::Blue,
        ));
        let rollback =
            RollbackController::new(switcher.clone(), self.prober.clone(), &self.config).unwrap();

        Ports {
            runtime: Arc::new(FakeRuntime {
                reachable: self.runtime_reachable,
            }),
            services: self.services.clone(),
            store: self.store.clone(),
            proxy: self.proxy.clone(),
            switcher,
            prober: self.prober.clone(),
            smoke: self.smoke.clone(),
            rollback: Arc::new(rollback),
            notifier: self.notifier.clone(),
        }
    }
}
