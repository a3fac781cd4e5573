//! HTTP listener lifecycle.
//!
//! [`bind`] resolves the `server` section of the configuration into a
//! listening socket; [`serve`] runs the router on it until the given
//! shutdown future completes. [`start_server`] is the two together with
//! `Ctrl-C` as the shutdown signal, which is what the binary uses.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use callstats_core::config::HttpConfig;
use callstats_esl::Connector;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Bind the listener for `config.host:config.port`.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is malformed or the port
/// cannot be bound.
pub async fn bind(config: &HttpConfig) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address {}: {e}", config.host)))?;

    TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve the API on `listener` until `shutdown` resolves.
///
/// In-flight requests finish before this returns.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] on a fatal I/O error.
pub async fn serve<C, F>(
    listener: TcpListener,
    state: Arc<AppState<C>>,
    shutdown: F,
) -> Result<(), ServerError>
where
    C: Connector + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let features = state.features;
    let router = build_router(state);

    match listener.local_addr() {
        Ok(addr) => info!(
            %addr,
            callcenter = features.callcenter,
            monitor = features.monitor,
            users = features.users,
            calls = features.calls,
            "callstats API listening"
        ),
        Err(e) => warn!(error = %e, "callstats API listening on an unknown address"),
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    info!("callstats API stopped");
    Ok(())
}

/// Bind and serve until `Ctrl-C`.
///
/// # Errors
///
/// See [`bind`] and [`serve`].
pub async fn start_server<C: Connector + 'static>(
    config: &HttpConfig,
    state: Arc<AppState<C>>,
) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, state, ctrl_c()).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
}

/// Errors that stop the HTTP listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address is invalid or already in use.
    #[error("bind error: {0}")]
    Bind(String),

    /// The accept loop failed.
    #[error("serve error: {0}")]
    Serve(String),
}
