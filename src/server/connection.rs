// Connection handling module
// Accepts a single TCP connection and serves HTTP/1.1 on it

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::{GracefulShutdown, Watcher};

use crate::config::{AppState, PerformanceConfig};
use crate::handler;
use crate::logger::{self, AccessLogEntry};

/// Accept a connection, enforcing `max_connections` when configured.
///
/// The connection is registered with `graceful` so shutdown can drain it.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    graceful: &GracefulShutdown,
) {
    // Increment first, then check, so concurrent accepts cannot both slip under the limit
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    if let Err(e) = stream.set_nodelay(true) {
        logger::log_debug(&format!("Failed to set TCP_NODELAY for {peer_addr}: {e}"));
    }

    logger::log_connection_accepted(&peer_addr);
    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
        graceful.watcher(),
    );
}

/// Time allowed to wait for the next request head, idle time included
fn head_timeout(performance: &PerformanceConfig) -> Duration {
    if performance.keep_alive_timeout > 0 {
        Duration::from_secs(performance.keep_alive_timeout)
    } else {
        Duration::from_secs(performance.read_timeout)
    }
}

/// Serve one connection on its own task.
///
/// hyper's header timer bounds how long the connection may sit waiting for
/// a request head; body reads are bounded per request by the handler.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
    watcher: Watcher,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .keep_alive(performance.keep_alive_timeout > 0)
            .header_read_timeout(head_timeout(performance));

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| serve_logged(req, peer_addr, Arc::clone(&service_state))),
        );

        if let Err(err) = watcher.watch(conn).await {
            if err.is_timeout() {
                logger::log_debug(&format!("Connection from {peer_addr} idle, closed"));
            } else {
                logger::log_connection_error(&err);
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Run the router and emit an access log line when enabled
async fn serve_logged(
    req: hyper::Request<hyper::body::Incoming>,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<hyper::Response<http_body_util::Full<hyper::body::Bytes>>, std::convert::Infallible> {
    if !state.access_log_enabled() {
        return handler::handle_request(req, state).await;
    }

    let started = Instant::now();
    let mut entry = AccessLogEntry::from_request(
        peer_addr.ip().to_string(),
        req.method(),
        req.uri(),
        req.version(),
        req.headers(),
    );
    let format = state.config.logging.access_log_format.clone();

    let response = handler::handle_request(req, state).await?;

    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    logger::log_access(&entry, &format);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn test_head_timeout_uses_keep_alive_when_enabled() {
        let mut performance = test_config().performance;
        performance.keep_alive_timeout = 75;
        performance.read_timeout = 30;
        assert_eq!(head_timeout(&performance), Duration::from_secs(75));

        performance.keep_alive_timeout = 0;
        assert_eq!(head_timeout(&performance), Duration::from_secs(30));
    }
}
