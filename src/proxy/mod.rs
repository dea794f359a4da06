// ABOUTME: Reverse proxy integration: upstream model, storage, control, and cutover.
// ABOUTME: The upstream file is the only shared mutable resource the orchestrator touches.

mod control;
mod store;
mod switcher;
mod tracker;
mod upstream;

pub use control::{CommandProxy, ProxyControl, ProxyError};
pub use store::{FileUpstreamStore, MemoryUpstreamStore, UpstreamStore};
pub use switcher::{Recovery, SwitchError, SwitchOutcome, TrafficSwitch, TrafficSwitcher};
pub use tracker::{Ambiguity, Detection, DetectionFallback, detect_active};
pub use upstream::{MarkerState, UpstreamConfig, UpstreamEntry, UpstreamError};
