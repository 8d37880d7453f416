//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT/SIGTERM and trigger graceful shutdown
//! - Turn SIGHUP into a policy reload request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - On non-unix targets only Ctrl-C is observed and reloads rely on the file watcher

use tokio::sync::mpsc;

use crate::lifecycle::Shutdown;

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received"),
        _ = terminate => tracing::info!("SIGTERM received"),
    }
}

/// Spawn a task that triggers `shutdown` on SIGINT/SIGTERM.
pub fn spawn_shutdown_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        wait_for_termination().await;
        shutdown.trigger();
    });
}

/// Spawn a task that sends on `reload_tx` for every SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_listener(reload_tx: mpsc::UnboundedSender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("SIGHUP reload unavailable: {}", e);
                return;
            }
        };
        while hangup.recv().await.is_some() {
            tracing::info!("SIGHUP received, reloading policy");
            if reload_tx.send(()).is_err() {
                break;
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_reload_listener(_reload_tx: mpsc::UnboundedSender<()>) {}
