//! Service state machine.
//!
//! ```text
//! Starting  → Listening | FailedFatal
//! Listening → Draining  | FailedFatal
//! Draining  → Stopped   | FailedFatal
//! ```

use std::net::SocketAddr;

use tokio::sync::watch;

/// Lifecycle state of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Starting,
    Listening,
    Draining,
    Stopped,
    FailedFatal,
}

impl ServiceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ServiceState::Stopped | ServiceState::FailedFatal)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        use ServiceState::*;
        matches!(
            (self, next),
            (Starting, Listening)
                | (Starting, FailedFatal)
                | (Listening, Draining)
                | (Listening, FailedFatal)
                | (Draining, Stopped)
                | (Draining, FailedFatal)
        )
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceState::Starting => "starting",
            ServiceState::Listening => "listening",
            ServiceState::Draining => "draining",
            ServiceState::Stopped => "stopped",
            ServiceState::FailedFatal => "failed",
        };
        f.write_str(s)
    }
}

/// Writer side, owned by the orchestrator.
#[derive(Debug)]
pub(crate) struct StateCell {
    state: watch::Sender<ServiceState>,
    local_addr: watch::Sender<Option<SocketAddr>>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            state: watch::Sender::new(ServiceState::Starting),
            local_addr: watch::Sender::new(None),
        }
    }

    pub(crate) fn get(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Apply a transition; illegal transitions are ignored and logged.
    pub(crate) fn set(&self, next: ServiceState) {
        let current = self.get();
        if !current.can_transition_to(next) {
            tracing::warn!(from = %current, to = %next, "Ignoring illegal state transition");
            return;
        }
        tracing::debug!(from = %current, to = %next, "Service state changed");
        self.state.send_replace(next);
    }

    pub(crate) fn set_local_addr(&self, addr: SocketAddr) {
        self.local_addr.send_replace(Some(addr));
    }

    pub(crate) fn monitor(&self) -> LifecycleMonitor {
        LifecycleMonitor {
            state: self.state.subscribe(),
            local_addr: self.local_addr.subscribe(),
        }
    }
}

/// Read-only view of a running orchestrator.
#[derive(Debug, Clone)]
pub struct LifecycleMonitor {
    state: watch::Receiver<ServiceState>,
    local_addr: watch::Receiver<Option<SocketAddr>>,
}

impl LifecycleMonitor {
    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Address the listener bound, once it is listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.borrow()
    }

    /// Wait until the state satisfies `pred`.
    ///
    /// Returns `None` if the orchestrator went away first.
    pub async fn wait_for(&mut self, pred: impl FnMut(&ServiceState) -> bool) -> Option<ServiceState> {
        self.state.wait_for(pred).await.ok().map(|s| *s)
    }
}
