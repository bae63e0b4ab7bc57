// Server loop module
// Accepts connections until shutdown is requested, then drains them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::ShutdownSignal;
use crate::config::AppState;
use crate::logger;

/// Accept connections on `listener` and hand each to its own task.
///
/// Once `shutdown` fires the listener is closed and in-flight requests get up
/// to `performance.shutdown_timeout` seconds to finish before this returns.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<ShutdownSignal>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections, &graceful);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.wait() => {
                logger::log_info(&format!(
                    "[SHUTDOWN] Listener on {} closed, draining {} connection(s)",
                    listener.local_addr()?,
                    active_connections.load(Ordering::SeqCst)
                ));
                break;
            }
        }
    }

    drop(listener);
    let grace_secs = state.config.performance.shutdown_timeout;
    drain_connections(graceful, &active_connections, grace_secs).await;
    Ok(())
}

/// Ask every watched connection to finish its current request, then wait for them
async fn drain_connections(graceful: GracefulShutdown, active: &AtomicUsize, grace_secs: u64) {
    match tokio::time::timeout(Duration::from_secs(grace_secs), graceful.shutdown()).await {
        Ok(()) => logger::log_info("[SHUTDOWN] All connections drained"),
        Err(_) => logger::log_warning(&format!(
            "[SHUTDOWN] {} connection(s) still open after {grace_secs}s, closing",
            active.load(Ordering::SeqCst)
        )),
    }
}
