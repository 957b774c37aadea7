// Server module entry point
// Runtime setup, listener binding and graceful shutdown

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

use crate::config::{AppState, Config};
use crate::handler::Service;
use crate::logger;

pub use listener::create_listener;
pub use server_loop::start_server_loop;

/// Run `service` until SIGINT/SIGTERM.
///
/// Builds the multi-threaded runtime sized by `server.workers`, binds the
/// configured address (failure is returned to the caller) and serves
/// connections on a `LocalSet`.
pub fn run<S>(name: &str, config: Config, service: S) -> Result<(), Box<dyn std::error::Error>>
where
    S: Service + 'static,
{
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = config.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(name, config, service))
}

async fn async_main<S>(
    name: &str,
    config: Config,
    service: S,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: Service + 'static,
{
    let addr = config.get_socket_addr()?;
    let listener = create_listener(addr)
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    logger::log_server_start(name, &addr, &config);

    let shutdown = Arc::new(Notify::new());
    signal::start_signal_handler(Arc::clone(&shutdown));

    let state = Arc::new(AppState::new(config));

    // Use LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(start_server_loop(listener, state, Arc::new(service), shutdown))
        .await;

    info!("{name} stopped");
    Ok(())
}
