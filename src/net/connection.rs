//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently inside the router
//! - Give each request a unique ID for tracing
//! - Report what a drain would abandon
//! - Cancel requests abandoned by a timed-out drain

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Global atomic counter for request IDs.
/// Relaxed ordering is enough since only uniqueness matters.
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new() -> Self {
        Self(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Counts requests that have entered the router and not yet completed.
///
/// Clones share the count and the abandon signal.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    active: Arc<watch::Sender<u64>>,
    abandon: CancellationToken,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self {
            active: Arc::new(watch::Sender::new(0)),
            abandon: CancellationToken::new(),
        }
    }

    /// Record a new request. The returned guard decrements on drop.
    pub fn track(&self) -> InFlightGuard {
        self.active.send_modify(|n| *n += 1);
        InFlightGuard {
            active: Arc::clone(&self.active),
            id: RequestId::new(),
        }
    }

    pub fn active(&self) -> u64 {
        *self.active.borrow()
    }

    /// Cancel every tracked request at its next await point.
    pub fn abandon(&self) {
        self.abandon.cancel();
    }

    /// Wait until no request is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Middleware body: hold a guard for the request and race it against `abandon`.
    pub async fn middleware(self, request: Request, next: Next) -> Response {
        let guard = self.track();
        tracing::trace!(request_id = %guard.id(), path = %request.uri().path(), "Request started");
        tokio::select! {
            biased;
            _ = self.abandon.cancelled() => {
                tracing::warn!(request_id = %guard.id(), "Request abandoned");
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
            response = next.run(request) => response,
        }
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard held for a request's lifetime.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<watch::Sender<u64>>,
    id: RequestId,
}

impl InFlightGuard {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.send_modify(|n| *n -= 1);
        tracing::trace!(request_id = %self.id, "Request finished");
    }
}
