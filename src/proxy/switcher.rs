// ABOUTME: Traffic switcher: backup, rewrite, validate, reload, then drop the backup.
// ABOUTME: Any failure restores the backup; also recovers from an interrupted switch.

use async_trait::async_trait;
use std::sync::Arc;

use super::control::{ProxyControl, ProxyError};
use super::store::UpstreamStore;
use super::tracker::{Ambiguity, Detection, DetectionFallback, detect_active};
use super::upstream::UpstreamError;
use crate::types::Environment;

#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("cannot determine the active environment: {0}")]
    Ambiguous(Ambiguity),

    #[error("rewritten upstream config does not mark {expected} active")]
    NotApplied { expected: Environment },

    #[error("proxy rejected the rewritten config: {0}")]
    Validation(#[source] ProxyError),

    #[error("proxy reload failed: {0}")]
    Reload(#[source] ProxyError),

    #[error("{cause}; restoring the previous upstream config also failed: {restore}")]
    RestoreFailed { cause: String, restore: String },
}

impl SwitchError {
    /// False when the upstream file may be left in the rewritten state.
    pub fn config_restored(&self) -> bool {
        !matches!(self, SwitchError::RestoreFailed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Target was already live; nothing was written.
    AlreadyActive(Environment),
    Switched {
        from: Option<Environment>,
        to: Environment,
    },
}

/// What PREFLIGHT found and did about a leftover backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Dry run: reported only.
    Pending,
    /// The backup was put back and the proxy reloaded.
    RestoredBackup,
}

#[async_trait]
pub trait TrafficSwitch: Send + Sync {
    async fn detect(&self) -> Result<Detection, SwitchError>;

    /// Point the proxy at `target`. Switching to the live environment is a no-op.
    async fn switch(&self, target: Environment) -> Result<SwitchOutcome, SwitchError>;

    async fn recover(&self, dry_run: bool) -> Result<Option<Recovery>, SwitchError>;
}

pub struct TrafficSwitcher {
    store: Arc<dyn UpstreamStore>,
    proxy: Arc<dyn ProxyControl>,
    fallback: DetectionFallback,
}

impl TrafficSwitcher {
    pub fn new(
        store: Arc<dyn UpstreamStore>,
        proxy: Arc<dyn ProxyControl>,
        fallback: DetectionFallback,
    ) -> Self {
        Self {
            store,
            proxy,
            fallback,
        }
    }

    /// Put the backup back after a failed step and hand back the original cause.
    async fn restore(&self, cause: SwitchError, reload_again: bool) -> SwitchError {
        tracing::warn!("Switch failed ({}); restoring previous upstream config", cause);

        if let Err(e) = self.store.restore_backup() {
            tracing::error!("Failed to restore upstream backup: {}", e);
            return SwitchError::RestoreFailed {
                cause: cause.to_string(),
                restore: e.to_string(),
            };
        }

        if reload_again && let Err(e) = self.proxy.reload().await {
            tracing::error!("Reload of restored upstream config failed: {}", e);
            return SwitchError::RestoreFailed {
                cause: cause.to_string(),
                restore: format!("reload of restored config failed: {}", e),
            };
        }

        cause
    }
}

#[async_trait]
impl TrafficSwitch for TrafficSwitcher {
    async fn detect(&self) -> Result<Detection, SwitchError> {
        detect_active(self.store.as_ref(), self.fallback)
    }

    async fn switch(&self, target: Environment) -> Result<SwitchOutcome, SwitchError> {
        let current = self.store.read()?;
        let from = current.active();
        if from == Some(target) {
            tracing::info!("{} is already active; nothing to switch", target);
            return Ok(SwitchOutcome::AlreadyActive(target));
        }

        let mut next = current;
        next.activate(target);

        self.store.backup()?;

        if let Err(e) = self.store.write(&next) {
            return Err(self.restore(e.into(), false).await);
        }

        match self.store.read() {
            Ok(written) if written.active() == Some(target) => {}
            Ok(_) => {
                let cause = SwitchError::NotApplied { expected: target };
                return Err(self.restore(cause, false).await);
            }
            Err(e) => return Err(self.restore(e.into(), false).await),
        }

        if let Err(e) = self.proxy.validate().await {
            return Err(self.restore(SwitchError::Validation(e), false).await);
        }

        if let Err(e) = self.proxy.reload().await {
            return Err(self.restore(SwitchError::Reload(e), true).await);
        }

        if let Err(e) = self.store.discard_backup() {
            tracing::warn!("Switched, but the upstream backup could not be removed: {}", e);
        }

        tracing::info!(
            "Traffic switched from {} to {}",
            from.map(|e| e.as_str()).unwrap_or("unknown"),
            target
        );
        Ok(SwitchOutcome::Switched { from, to: target })
    }

    async fn recover(&self, dry_run: bool) -> Result<Option<Recovery>, SwitchError> {
        if !self.store.has_backup() {
            return Ok(None);
        }

        if dry_run {
            tracing::warn!(
                "Found the backup of an interrupted switch next to {}; dry run leaves it in place",
                self.store.location()
            );
            return Ok(Some(Recovery::Pending));
        }

        // A leftover backup is the last config known to be live
        tracing::warn!(
            "Restoring the upstream backup of an interrupted switch ({})",
            self.store.location()
        );
        self.store.restore_backup()?;
        self.proxy.reload().await.map_err(SwitchError::Reload)?;
        Ok(Some(Recovery::RestoredBackup))
    }
}
