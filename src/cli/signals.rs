//! Signal handling for graceful shutdown

use crate::engine::CancellationToken;

/// Wait for SIGINT/SIGTERM and fire the cancellation token
///
/// The engine finishes in-flight steps, persists a final checkpoint
/// and returns a non-success result; a second signal while draining
/// exits immediately.
pub async fn setup_signal_handlers(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                eprintln!("\nReceived SIGINT, finishing in-flight steps...");
            }
            _ = sigterm.recv() => {
                eprintln!("\nReceived SIGTERM, finishing in-flight steps...");
            }
        }

        token.cancel();

        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        eprintln!("\nForced shutdown");
        std::process::exit(130);
    }

    #[cfg(not(unix))]
    {
        use tokio::signal::ctrl_c;

        ctrl_c().await.expect("failed to install Ctrl+C handler");
        eprintln!("\nReceived Ctrl+C, finishing in-flight steps...");
        token.cancel();

        ctrl_c().await.expect("failed to install Ctrl+C handler");
        eprintln!("\nForced shutdown");
        std::process::exit(130);
    }
}
