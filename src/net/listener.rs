//! HTTP listener with background serving and bounded drain.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Run the accept loop on a spawned task
//! - Surface accept failures to the coordinator instead of retrying them
//! - Drain in-flight requests within a deadline, cancelling what is left

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::middleware::Next;
use axum::Router;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::net::connection::InFlightTracker;

/// How long abandoned handlers get to unwind after a timed-out drain.
const ABANDON_WAIT: Duration = Duration::from_millis(250);

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Accepting a connection failed for a reason other than the peer.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The serve loop itself returned an error.
    #[error("listener failed: {0}")]
    Serve(#[source] io::Error),
}

/// Result of a bounded drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All in-flight work finished before the deadline.
    Completed,
    /// The deadline elapsed with work still in flight.
    TimedOut,
}

/// Byte stream for one accepted connection.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Source of incoming connections.
#[async_trait]
pub trait Acceptor: Send + 'static {
    async fn accept(&mut self) -> io::Result<(Box<dyn Connection>, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl Acceptor for TcpListener {
    async fn accept(&mut self) -> io::Result<(Box<dyn Connection>, SocketAddr)> {
        let (stream, peer) = TcpListener::accept(self).await?;
        Ok((Box::new(stream), peer))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Binds [`Acceptor`]s to addresses.
#[async_trait]
pub trait Binder: Send + Sync {
    async fn bind(&self, addr: SocketAddr) -> io::Result<Box<dyn Acceptor>>;
}

/// Binds plain TCP listeners.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpBinder;

#[async_trait]
impl Binder for TcpBinder {
    async fn bind(&self, addr: SocketAddr) -> io::Result<Box<dyn Acceptor>> {
        Ok(Box::new(TcpListener::bind(addr).await?))
    }
}

/// Errors caused by a single peer; the accept loop moves on.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

/// Listener handed to axum. Any other accept error is reported once and the
/// listener then stops producing connections.
struct GuardedListener {
    inner: Box<dyn Acceptor>,
    local_addr: SocketAddr,
    failure: mpsc::Sender<ServerError>,
}

impl axum::serve::Listener for GuardedListener {
    type Io = Box<dyn Connection>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.inner.accept().await {
                Ok(conn) => return conn,
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Peer dropped before accept completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                    let _ = self.failure.try_send(ServerError::Accept(e));
                    return std::future::pending().await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        Ok(self.local_addr)
    }
}

/// Bind `addr` over TCP and start serving `router` on a background task.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<RunningListener, ServerError> {
    serve_with(&TcpBinder, router, addr).await
}

/// Bind `addr` with `binder` and start serving `router` on a background task.
///
/// Returns once the socket is bound; never waits for the accept loop.
pub async fn serve_with(
    binder: &dyn Binder,
    router: Router,
    addr: SocketAddr,
) -> Result<RunningListener, ServerError> {
    let acceptor = binder
        .bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local_addr = acceptor
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;

    let in_flight = InFlightTracker::new();
    let tracker = in_flight.clone();
    let router = router.layer(axum::middleware::from_fn(move |req: Request, next: Next| {
        tracker.clone().middleware(req, next)
    }));

    let stop = CancellationToken::new();
    let (failure_tx, failure) = mpsc::channel(1);
    let listener = GuardedListener {
        inner: acceptor,
        local_addr,
        failure: failure_tx.clone(),
    };

    let token = stop.clone();
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(token.cancelled_owned())
            .await;
        match result {
            Ok(()) => tracing::info!("HTTP server stopped"),
            Err(e) => {
                let _ = failure_tx.try_send(ServerError::Serve(e));
            }
        }
    });

    tracing::info!(address = %local_addr, "Listening for connections");

    Ok(RunningListener {
        local_addr,
        stop,
        task,
        failure,
        in_flight,
    })
}

/// Handle to a listener serving on a background task.
pub struct RunningListener {
    local_addr: SocketAddr,
    stop: CancellationToken,
    task: JoinHandle<()>,
    failure: mpsc::Receiver<ServerError>,
    in_flight: InFlightTracker,
}

impl RunningListener {
    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests currently being handled.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.active()
    }

    /// Resolve when accepting fails. Pending forever after a clean stop.
    pub async fn failed(&mut self) -> ServerError {
        match self.failure.recv().await {
            Some(err) => err,
            None => std::future::pending().await,
        }
    }

    /// Stop accepting and wait up to `deadline` for in-flight requests.
    ///
    /// On timeout the remaining handlers are cancelled at their next await
    /// point; handlers that never yield cannot be stopped.
    pub async fn drain(mut self, deadline: Duration) -> ShutdownOutcome {
        self.stop.cancel();

        if tokio::time::timeout(deadline, &mut self.task).await.is_ok() {
            return ShutdownOutcome::Completed;
        }

        tracing::warn!(
            abandoned = self.in_flight.active(),
            deadline = ?deadline,
            "Drain deadline elapsed, abandoning in-flight requests"
        );
        self.abort().await;
        ShutdownOutcome::TimedOut
    }

    /// Stop immediately: cancel in-flight requests without a grace period.
    pub async fn abort(self) {
        self.stop.cancel();
        self.in_flight.abandon();
        self.task.abort();

        if tokio::time::timeout(ABANDON_WAIT, self.in_flight.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.in_flight.active(),
                "Handlers still running after cancellation"
            );
        }
    }
}
