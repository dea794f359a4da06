// ABOUTME: Which container engine answered and where, plus the `runtime:` config section.
// ABOUTME: Podman and Docker both speak the Docker-compatible API over a unix socket.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Docker,
    Podman,
}

impl RuntimeKind {
    /// Best guess for a socket given without an explicit kind.
    pub fn from_socket(socket: &str) -> Self {
        if socket.contains("podman") {
            RuntimeKind::Podman
        } else {
            RuntimeKind::Docker
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::Docker => "docker",
            RuntimeKind::Podman => "podman",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEndpoint {
    pub kind: RuntimeKind,
    pub socket: String,
}

impl RuntimeEndpoint {
    pub fn new(kind: RuntimeKind, socket: impl Into<String>) -> Self {
        Self {
            kind,
            socket: socket.into(),
        }
    }
}

impl fmt::Display for RuntimeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.socket)
    }
}

/// `runtime:` section. Unset fields mean auto-detect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub runtime: Option<RuntimeKind>,

    #[serde(default)]
    pub socket: Option<String>,

    /// Skip the PREFLIGHT reachability check, for hosts whose deploy step
    /// drives a remote engine.
    #[serde(default)]
    pub skip_check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_socket_path() {
        assert_eq!(
            RuntimeKind::from_socket("/run/user/1000/podman/podman.sock"),
            RuntimeKind::Podman
        );
        assert_eq!(
            RuntimeKind::from_socket("/var/run/docker.sock"),
            RuntimeKind::Docker
        );
    }

    #[test]
    fn endpoint_display() {
        let endpoint = RuntimeEndpoint::new(RuntimeKind::Podman, "/run/podman/podman.sock");
        assert_eq!(endpoint.to_string(), "podman at /run/podman/podman.sock");
    }
}
