//! HTTP status surface
//!
//! Callers submit jobs and poll installations by id. The server binds to
//! the configured address (localhost by default) and shuts down gracefully
//! when the supplied future resolves.

mod routes;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::state::ProvisionerState;

/// Build the router over shared state
pub fn router(state: Arc<ProvisionerState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/installations", post(routes::submit))
        .route("/api/installations/:id", get(routes::status))
        .route("/api/installations/:id/cancel", post(routes::cancel))
        .with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve(
    state: Arc<ProvisionerState>,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!("Status API listening on {}", address);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
