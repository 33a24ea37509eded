//! API routes for vigild

use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use vigil_shared::api::{
    CancelResponse, ErrorResponse, HealthResponse, ItemsQuery, ItemsResponse, ModulesResponse,
    ProgressResponse, RunAuditResponse,
};
use vigil_shared::{AuditResult, VigilError};

type AppStateArc = Arc<AppState>;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, e: &VigilError) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code: e.code(),
            message: e.to_string(),
        }),
    )
}

// ============================================================================
// Module Routes
// ============================================================================

pub fn module_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/modules", get(list_modules))
}

async fn list_modules(State(state): State<AppStateArc>) -> Result<Json<ModulesResponse>, ApiError> {
    let modules = state.audit.modules().map_err(|e| {
        error!("  Module catalog unavailable: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, &e)
    })?;
    Ok(Json(ModulesResponse { modules }))
}

// ============================================================================
// Audit Routes
// ============================================================================

pub fn audit_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/audit/run", post(run_audit))
        .route("/v1/audit/cancel", post(cancel_audit))
        .route("/v1/audit/progress", get(audit_progress))
        .route("/v1/audit/latest", get(latest_audit))
        .route("/v1/audit/items", get(audit_items))
}

async fn run_audit(State(state): State<AppStateArc>) -> Result<Json<RunAuditResponse>, ApiError> {
    match state.audit.start().await {
        Ok(run_id) => {
            info!("  Audit requested: {}", run_id);
            Ok(Json(RunAuditResponse { run_id }))
        }
        Err(e @ VigilError::AuditInProgress(_)) => {
            warn!("  Audit request rejected: {}", e);
            Err(api_error(StatusCode::CONFLICT, &e))
        }
        Err(e) => {
            error!("  Audit could not start: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, &e))
        }
    }
}

async fn cancel_audit(State(state): State<AppStateArc>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.audit.cancel().await,
    })
}

async fn audit_progress(State(state): State<AppStateArc>) -> Json<ProgressResponse> {
    Json(state.audit.progress().await)
}

async fn latest_audit(State(state): State<AppStateArc>) -> Result<Json<AuditResult>, ApiError> {
    match state.audit.latest().await {
        Some(result) => Ok(Json(result.as_ref().clone())),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            &VigilError::Internal("no audit has completed yet".to_string()),
        )),
    }
}

async fn audit_items(
    State(state): State<AppStateArc>,
    Query(query): Query<ItemsQuery>,
) -> Json<ItemsResponse> {
    let reporter = state.audit.reporter().await;
    Json(ItemsResponse {
        run_id: reporter.latest().map(|r| r.run_id),
        items: reporter.filter(query.category, query.status, query.severity),
    })
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let reporter = state.audit.reporter().await;

    Json(HealthResponse {
        version: vigil_shared::VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        audit_running: state.audit.is_running().await,
        overall_health: reporter.overall_health_percent(),
        summary: reporter.summary(),
        recovery: reporter.recovery(),
    })
}
