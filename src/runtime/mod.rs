// ABOUTME: Container runtime detection and reachability for PREFLIGHT.
// ABOUTME: Auto-detects the Docker or Podman socket or uses explicit config.

mod detection;
mod error;
mod probe;
mod types;

pub use detection::{DetectionError, resolve_runtime};
pub use error::RuntimeError;
pub use probe::{BollardProbe, RuntimeProbe, SkipRuntimeCheck};
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeKind};
