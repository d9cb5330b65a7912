//! OS signal handling.
//!
//! SIGINT and SIGTERM trigger a graceful shutdown of the HTTPS server through
//! its [`Handle`].

use std::time::Duration;

use axum_server::Handle;

/// Time granted to in-flight connections after a shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Resolve when the process receives SIGINT or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Spawn a task that shuts `handle` down gracefully on the first signal.
pub fn spawn_signal_handler(handle: Handle) {
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "Shutdown signal received, draining connections"
        );
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });
}
