// ABOUTME: Validated domain types shared across the orchestrator.
// ABOUTME: Environments, versions, and service selection.

mod environment;
mod service_name;
mod version;

pub use environment::{Environment, EnvironmentState, ParseEnvironmentError};
pub use service_name::{ServiceName, ServiceNameError, ServiceTarget};
pub use version::{Version, VersionError};
