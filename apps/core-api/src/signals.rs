//! Process signals as a cancellation source.

use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on Ctrl+C or SIGTERM and return the signal's name.
///
/// Returns `None` when the token is cancelled by someone else first. A
/// handler that cannot be installed is logged and never fires.
pub async fn cancel_on_signal(token: CancellationToken) -> Option<&'static str> {
    let received = tokio::select! {
        () = token.cancelled() => return None,
        name = interrupt() => name,
        name = terminate() => name,
    };
    tracing::info!(signal = received, "shutdown signal received, initiating graceful shutdown");
    token.cancel();
    Some(received)
}

async fn interrupt() -> &'static str {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for SIGINT");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

#[cfg(unix)]
async fn terminate() -> &'static str {
    use signal::unix::{SignalKind, signal as unix_signal};

    match unix_signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
    "SIGTERM"
}

#[cfg(not(unix))]
async fn terminate() -> &'static str {
    std::future::pending().await
}
