//! Termination signals for the projenv CLI.
//!
//! A CI timeout or Ctrl+C must not leave the session directory behind. The
//! session future is raced against the signal and dropped when the signal
//! wins, which runs the session's teardown before the process exits.

use crate::cli::EXIT_SIGINT;
use std::future::Future;
use tracing::{info, warn};

/// Run `work` unless `shutdown` completes first.
///
/// Returns the exit code of whichever finished. When `shutdown` wins, `work`
/// is dropped before this returns.
pub async fn run_until_shutdown<W, S>(work: W, shutdown: S) -> i32
where
    W: Future<Output = i32>,
    S: Future<Output = i32>,
{
    tokio::select! {
        biased;

        code = shutdown => {
            warn!(exit_code = code, "Interrupted, abandoning session");
            code
        }
        code = work => code,
    }
}

/// Wait for SIGINT or SIGTERM and return the matching exit code.
///
/// Never completes if the handlers cannot be installed.
#[cfg(unix)]
pub async fn shutdown_signal() -> i32 {
    use crate::cli::EXIT_SIGTERM;
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigint, mut sigterm) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Failed to install signal handlers");
                return std::future::pending().await;
            }
        };

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT");
            EXIT_SIGINT
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
            EXIT_SIGTERM
        }
    }
}

/// Wait for Ctrl+C and return the matching exit code.
///
/// Never completes if the handler cannot be installed.
#[cfg(not(unix))]
pub async fn shutdown_signal() -> i32 {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C");
            EXIT_SIGINT
        }
        Err(e) => {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending().await
        }
    }
}
