// ABOUTME: Container runtime socket detection on the local host.
// ABOUTME: Explicit config wins; otherwise checks Podman sockets first, then Docker.

use super::types::{RuntimeConfig, RuntimeEndpoint, RuntimeKind};
use std::path::Path;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked Podman and Docker sockets)")]
    NoRuntimeFound,

    #[error("configured runtime socket {0} does not exist")]
    SocketMissing(String),
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Resolve the runtime socket to check.
///
/// Order when not configured:
/// 1. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 2. Rootful Podman socket (`/run/podman/podman.sock`)
/// 3. Docker socket (`/var/run/docker.sock`)
pub fn resolve_runtime(config: &RuntimeConfig) -> Result<RuntimeEndpoint, DetectionError> {
    if let Some(ref socket) = config.socket {
        if !Path::new(socket).exists() {
            return Err(DetectionError::SocketMissing(socket.clone()));
        }
        let kind = config
            .runtime
            .unwrap_or_else(|| RuntimeKind::from_socket(socket));
        return Ok(RuntimeEndpoint::new(kind, socket.as_str()));
    }

    candidate_sockets(get_uid())
        .into_iter()
        .filter(|(kind, _)| config.runtime.is_none_or(|wanted| wanted == *kind))
        .find(|(_, socket)| Path::new(socket).exists())
        .map(|(kind, socket)| RuntimeEndpoint::new(kind, socket))
        .ok_or(DetectionError::NoRuntimeFound)
}

fn candidate_sockets(uid: Option<String>) -> Vec<(RuntimeKind, String)> {
    let mut sockets = Vec::with_capacity(3);
    if let Some(uid) = uid {
        sockets.push((
            RuntimeKind::Podman,
            format!("/run/user/{}/podman/podman.sock", uid),
        ));
    }
    sockets.push((RuntimeKind::Podman, ROOTFUL_PODMAN.to_string()));
    sockets.push((RuntimeKind::Docker, DOCKER_SOCKET.to_string()));
    sockets
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        // Fall back to reading /proc/self/status
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}
