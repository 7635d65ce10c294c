use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `cancelation` once the process is asked to stop, either by Ctrl-C or, on unix, by the
/// SIGTERM sent by `worktracker stop`.
///
/// On Windows detached processes can't detect signals sent to them, so there the daemon is simply
/// killed and loses whatever happened since the last periodic flush.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        },
        _ = terminate() => {
            info!("Received SIGTERM, shutting down");
        },
        _ = cancelation.cancelled() => (),
    };
    cancelation.cancel();
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!("Failed to listen for SIGTERM {e:?}");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
