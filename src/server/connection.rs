// Connection handling module
// Accepts and serves a single TCP connection

use hyper::body::{Body, Incoming};
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::AppState;
use crate::handler::Service;
use crate::http::ResponseBody;
use crate::logger::{self, AccessLogEntry};

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `service` - Application answering the requests
pub fn accept_connection<S>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    service: &Arc<S>,
) where
    S: Service + 'static,
{
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= max_conn {
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_connection_rejected(&peer_addr, prev_count, max_conn);
            drop(stream);
            return;
        }
    }

    debug!(peer = %peer_addr, "Accepted connection");
    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(service));
}

/// Handle a single connection in a spawned task.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures HTTP/1.1 connection settings (keep-alive)
/// 3. Serves the connection with the application service
/// 4. Applies the connection timeout
/// 5. Decrements connection counter when done
fn handle_connection<S>(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    service: Arc<S>,
) where
    S: Service + 'static,
{
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);
        let timeout_secs = state.config.performance.connection_timeout;

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);

        let request_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let service = Arc::clone(&service);
                let state = Arc::clone(&request_state);
                async move {
                    Ok::<_, Infallible>(respond(service.as_ref(), &state, peer_addr, req).await)
                }
            }),
        );

        // A zero timeout leaves connections unbounded
        let outcome = if timeout_secs == 0 {
            Ok(conn.await)
        } else {
            tokio::time::timeout(Duration::from_secs(timeout_secs), conn).await
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&peer_addr, &err),
            Err(_) => logger::log_connection_timeout(&peer_addr, timeout_secs),
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Run one request through the service, stamping the `Server` header and
/// writing the access log line.
async fn respond<S: Service>(
    service: &S,
    state: &AppState,
    peer_addr: SocketAddr,
    req: Request<Incoming>,
) -> Response<ResponseBody> {
    let logging = &state.config.logging;
    let started = Instant::now();
    let entry = logging
        .access_log
        .then(|| AccessLogEntry::from_request(&peer_addr, &req));

    let mut resp = service.call(req).await;

    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        resp.headers_mut().entry(SERVER).or_insert(server_name);
    }

    if let Some(mut entry) = entry {
        entry.status = resp.status().as_u16();
        entry.body_bytes = resp.body().size_hint().exact().or_else(|| {
            resp.headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        });
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &logging.access_log_format);
    }

    resp
}
