use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a handler for SIGINT and SIGTERM.
///
/// Returns a `CancellationToken` cancelled on the first signal. The
/// poller watches it so an interrupted solve can still kill its remote
/// job before the process exits.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, cancelling the solve");
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, cancelling the solve");
            }
        }

        token_clone.cancel();
    });

    token
}
