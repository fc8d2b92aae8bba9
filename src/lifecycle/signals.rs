//! OS signal handling.
//!
//! Installing the handlers replaces the default disposition for the rest of the
//! process, so signals after the first are swallowed rather than killing the
//! process mid-drain.

use crate::lifecycle::shutdown::Shutdown;

/// Wait for SIGINT or SIGTERM (Ctrl+C only on non-unix targets).
pub async fn termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let signal = tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    };
    tracing::info!(signal, "Shutdown signal received");
}

/// Spawn a task that triggers `shutdown` on the first termination signal.
pub fn forward_to(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        termination().await;
        shutdown.trigger();
    })
}
