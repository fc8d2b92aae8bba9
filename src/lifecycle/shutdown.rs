//! Termination request for the orchestrator.

use tokio_util::sync::CancellationToken;

/// One-shot "stop now" request shared between signal handlers and the orchestrator.
///
/// The first `trigger` wins; later calls are no-ops.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new termination request that has not fired yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination.
    pub fn trigger(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("Termination requested");
        }
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once termination has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await
    }
}
