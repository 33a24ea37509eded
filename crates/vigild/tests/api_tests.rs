//! HTTP API behaviour, driven through the router without binding a socket.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use vigil_shared::api::{
    HealthResponse, ItemsResponse, ModulesResponse, ProgressResponse, RunAuditResponse,
};
use vigil_shared::{AuditResult, Category, ModuleDescriptor, Priority, VigilError};
use vigild::chance::FixedChance;
use vigild::health::{ComponentChecks, ModuleProber, RouteOutcome, RouteProbe};
use vigild::registry::{ModuleRegistry, ModuleSource};
use vigild::server::{self, AppState};
use vigild::{AuditOrchestrator, AuditService};

struct StubRoutes;

#[async_trait]
impl RouteProbe for StubRoutes {
    async fn check(&self, route: &str) -> RouteOutcome {
        if route == "/reviews" {
            RouteOutcome::NotFound { status: 404 }
        } else {
            RouteOutcome::Found { status: 200 }
        }
    }
}

struct BrokenCatalog;

impl ModuleSource for BrokenCatalog {
    fn list_modules(&self) -> Result<Vec<ModuleDescriptor>, VigilError> {
        Err(VigilError::Registry("catalog file unreadable".into()))
    }
}

fn app_with(source: Arc<dyn ModuleSource>) -> (Router, Arc<AuditService>) {
    let prober = ModuleProber::new(
        Arc::new(StubRoutes),
        ComponentChecks::new(),
        Arc::new(FixedChance::never()),
    );
    let audit = AuditService::new(AuditOrchestrator::new(source, prober, None));
    let router = server::router(Arc::new(AppState::new(audit.clone())));
    (router, audit)
}

fn app() -> (Router, Arc<AuditService>) {
    let registry = ModuleRegistry::new(vec![
        ModuleDescriptor::new("Home", Priority::Critical, Category::Page).with_route("/"),
        ModuleDescriptor::new("Reviews", Priority::Medium, Category::Page).with_route("/reviews"),
        ModuleDescriptor::new("Cache Layer", Priority::High, Category::Component)
            .with_component("cache"),
    ])
    .unwrap();
    app_with(Arc::new(registry))
}

async fn call(router: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json<T: DeserializeOwned>(router: &Router, uri: &str) -> T {
    let (status, body) = call(router, "GET", uri).await;
    assert_eq!(status, StatusCode::OK, "GET {}", uri);
    serde_json::from_slice(&body).unwrap()
}

async fn wait_idle(audit: &AuditService) {
    for _ in 0..200 {
        if !audit.is_running().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("audit did not finish");
}

#[tokio::test]
async fn lists_catalog_modules() {
    let (router, _) = app();
    let modules: ModulesResponse = get_json(&router, "/v1/modules").await;
    let names: Vec<&str> = modules.modules.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["Home", "Reviews", "Cache Layer"]);
}

#[tokio::test]
async fn health_and_latest_before_first_run() {
    let (router, _) = app();

    let health: HealthResponse = get_json(&router, "/v1/health").await;
    assert_eq!(health.overall_health, None);
    assert!(health.summary.is_none());

    let (status, _) = call(&router, "GET", "/v1/audit/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let items: ItemsResponse = get_json(&router, "/v1/audit/items").await;
    assert!(items.run_id.is_none());
    assert!(items.items.is_empty());
}

#[tokio::test]
async fn run_then_query_results() {
    let (router, audit) = app();

    let (status, body) = call(&router, "POST", "/v1/audit/run").await;
    assert_eq!(status, StatusCode::OK);
    let run: RunAuditResponse = serde_json::from_slice(&body).unwrap();
    wait_idle(&audit).await;

    let latest: AuditResult = get_json(&router, "/v1/audit/latest").await;
    assert_eq!(latest.run_id, run.run_id);
    assert_eq!(latest.working, 2);
    assert_eq!(latest.missing, 1);

    let missing: ItemsResponse = get_json(&router, "/v1/audit/items?status=missing").await;
    assert_eq!(missing.items.len(), 1);
    assert_eq!(missing.items[0].id, "reviews");

    let components: ItemsResponse =
        get_json(&router, "/v1/audit/items?category=component&severity=info").await;
    assert_eq!(components.items.len(), 1);
    assert_eq!(components.items[0].id, "cache-layer");

    let progress: ProgressResponse = get_json(&router, "/v1/audit/progress").await;
    assert!(!progress.running);
    assert_eq!(progress.progress.map(|p| p.percent), Some(100));

    let health: HealthResponse = get_json(&router, "/v1/health").await;
    assert_eq!(health.overall_health, Some(67));
}

#[tokio::test]
async fn unknown_filter_value_is_rejected() {
    let (router, _) = app();
    let (status, _) = call(&router, "GET", "/v1/audit/items?status=exploded").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_without_running_audit() {
    let (router, _) = app();
    let (status, body) = call(&router, "POST", "/v1/audit/cancel").await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["cancelled"], false);
}

#[tokio::test]
async fn catalog_failure_is_reported_to_caller() {
    let (router, audit) = app_with(Arc::new(BrokenCatalog));

    let (status, _) = call(&router, "GET", "/v1/modules").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = call(&router, "POST", "/v1/audit/run").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(value["message"].as_str().unwrap().contains("catalog"));

    assert!(!audit.is_running().await);
    let progress: ProgressResponse = get_json(&router, "/v1/audit/progress").await;
    assert!(progress.last_error.is_some());
}
