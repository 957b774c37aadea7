// Server loop module
// Accepts connections until shutdown, then drains the ones in flight

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::info;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::handler::Service;
use crate::logger;

/// Upper bound on how long shutdown waits for open connections
const DRAIN_GRACE: Duration = Duration::from_secs(5);
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept loop shared by both services.
///
/// Must run inside a `LocalSet`; every connection is served with
/// `spawn_local`. Returns once `shutdown` is notified and open connections
/// have finished or the drain grace period ran out.
pub async fn start_server_loop<S>(
    listener: TcpListener,
    state: Arc<AppState>,
    service: Arc<S>,
    shutdown: Arc<Notify>,
) where
    S: Service + 'static,
{
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &service);
                    }
                    Err(e) => logger::log_accept_error(&e),
                }
            }

            () = shutdown.notified() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }

    // Stop queueing new clients in the backlog while draining
    drop(listener);
    drain_connections(&state, DRAIN_GRACE).await;
}

/// Wait until no connection is active, or `grace` has elapsed.
async fn drain_connections(state: &AppState, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let active = state.active_connections.load(Ordering::SeqCst);
        if active == 0 {
            info!("All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            info!("Drain period elapsed with {active} connection(s) still open");
            return;
        }
        tokio::time::sleep(DRAIN_POLL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_state() -> Arc<AppState> {
        let config = Config::load_from("does-not-exist", "LOOPTEST", &Default::default()).unwrap();
        Arc::new(AppState::new(config))
    }

    #[tokio::test]
    async fn test_drain_returns_when_idle() {
        let state = test_state();
        let started = std::time::Instant::now();
        drain_connections(&state, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let state = test_state();
        state.active_connections.store(1, Ordering::SeqCst);
        let started = std::time::Instant::now();
        drain_connections(&state, Duration::from_millis(120)).await;
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_drain_sees_connection_close() {
        let state = test_state();
        state.active_connections.store(1, Ordering::SeqCst);

        let closer = Arc::clone(&state);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            closer.active_connections.fetch_sub(1, Ordering::SeqCst);
        });

        drain_connections(&state, Duration::from_secs(5)).await;
        assert_eq!(state.active_connections.load(Ordering::SeqCst), 0);
    }
}
