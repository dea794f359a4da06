// ABOUTME: Non-fatal findings gathered while a deployment runs.
// ABOUTME: Each one is logged when recorded and reported again in the run summary.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The lock file could not be removed and may block the next run.
    LockRelease,
    /// A stale, unreadable, or explicitly broken lock was replaced.
    StaleLock,
    /// An interrupted switch left an upstream backup behind.
    Recovery,
    /// The post-success cleanup step failed.
    Cleanup,
    /// A failed gate was overridden with --force.
    ForcedGate,
    /// The active environment came from the fallback policy.
    DetectionFallback,
    /// A smoke assertion passed but breached its latency ceiling.
    SoftAssertion,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::LockRelease => "lock_release",
            WarningKind::StaleLock => "stale_lock",
            WarningKind::Recovery => "recovery",
            WarningKind::Cleanup => "cleanup",
            WarningKind::ForcedGate => "forced_gate",
            WarningKind::DetectionFallback => "detection_fallback",
            WarningKind::SoftAssertion => "soft_assertion",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn lock_release(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockRelease, message)
    }

    pub fn stale_lock(message: impl Into<String>) -> Self {
        Self::new(WarningKind::StaleLock, message)
    }

    pub fn recovery(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Recovery, message)
    }

    pub fn cleanup(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Cleanup, message)
    }

    pub fn forced_gate(message: impl Into<String>) -> Self {
        Self::new(WarningKind::ForcedGate, message)
    }

    pub fn detection_fallback(message: impl Into<String>) -> Self {
        Self::new(WarningKind::DetectionFallback, message)
    }

    pub fn soft_assertion(message: impl Into<String>) -> Self {
        Self::new(WarningKind::SoftAssertion, message)
    }
}

/// Warnings in the order they were recorded.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = %warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Messages only, for the run summary.
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.message.clone()).collect()
    }
}
