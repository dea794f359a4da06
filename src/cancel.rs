// ABOUTME: Cooperative cancellation signal for probes, smoke runs, and gates.
// ABOUTME: A tokio-util CancellationToken split into a tripping handle and a read-only side.

use tokio_util::sync::CancellationToken;

/// Trips the paired [`Cancellation`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Receiving side, cheap to clone into concurrent tasks.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
}

impl Cancellation {
    /// Create a linked handle/signal pair.
    pub fn pair() -> (CancelHandle, Cancellation) {
        let token = CancellationToken::new();
        (
            CancelHandle {
                token: token.clone(),
            },
            Cancellation { token },
        )
    }

    /// A signal that never trips: no handle to it exists.
    pub fn never() -> Cancellation {
        Cancellation::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Sleep until `deadline` unless cancelled first. Returns false when cancelled.
    pub async fn sleep_until(&self, deadline: tokio::time::Instant) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep_until(deadline) => true,
        }
    }
}
