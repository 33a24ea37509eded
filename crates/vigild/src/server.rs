//! HTTP server for vigild

use crate::routes;
use crate::state::AuditService;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub audit: Arc<AuditService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(audit: Arc<AuditService>) -> Self {
        Self {
            audit,
            start_time: Instant::now(),
        }
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::module_routes())
        .merge(routes::audit_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until `shutdown` fires
pub async fn run(state: Arc<AppState>, addr: &str, shutdown: CancellationToken) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
