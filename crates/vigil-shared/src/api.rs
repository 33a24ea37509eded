//! Request and response bodies of the daemon HTTP API.

use crate::audit::{HealthSummary, RecoverySummary};
use crate::diagnostic::{DiagnosticItem, ModuleStatus, Severity};
use crate::module::{Category, ModuleDescriptor};
use crate::progress::AuditProgress;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModulesResponse {
    pub modules: Vec<ModuleDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAuditResponse {
    pub run_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Current state of the daemon's audit worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub running: bool,
    pub run_id: Option<Uuid>,
    pub progress: Option<AuditProgress>,
    /// Why the most recent run could not start or finish, if it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Filters for `/v1/audit/items`; all given filters must match
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemsQuery {
    pub category: Option<Category>,
    pub status: Option<ModuleStatus>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsResponse {
    pub run_id: Option<Uuid>,
    pub items: Vec<DiagnosticItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub audit_running: bool,
    /// None until the first audit run completes
    pub overall_health: Option<u8>,
    pub summary: Option<HealthSummary>,
    pub recovery: Option<RecoverySummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub message: String,
}
