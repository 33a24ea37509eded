//! Progress events emitted while an audit run is in flight.

use crate::audit::HealthSummary;
use crate::diagnostic::ModuleStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Percentage of modules finished, rounded down.
///
/// Rounding down keeps 100 reserved for the moment the last module is done.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed.min(total) * 100) / total) as u8
}

/// Snapshot taken after a module finished probing (and repair, if any)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditProgress {
    pub run_id: Uuid,
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    /// Module that just finished
    pub module: String,
    pub status: ModuleStatus,
}

impl AuditProgress {
    pub fn new(run_id: Uuid, completed: usize, total: usize, module: &str, status: ModuleStatus) -> Self {
        Self {
            run_id,
            completed,
            total,
            percent: progress_percent(completed, total),
            module: module.to_string(),
            status,
        }
    }
}

/// Event stream of one run, in emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    Started { run_id: Uuid, total: usize },
    Probing { run_id: Uuid, index: usize, module: String },
    Fixing { run_id: Uuid, index: usize, module: String },
    Progress(AuditProgress),
    Cancelled { run_id: Uuid, completed: usize, total: usize },
    Finished { run_id: Uuid, summary: HealthSummary },
}

impl AuditEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Started { run_id, .. }
            | Self::Probing { run_id, .. }
            | Self::Fixing { run_id, .. }
            | Self::Cancelled { run_id, .. }
            | Self::Finished { run_id, .. } => *run_id,
            Self::Progress(p) => p.run_id,
        }
    }

    pub fn as_progress(&self) -> Option<&AuditProgress> {
        match self {
            Self::Progress(p) => Some(p),
            _ => None,
        }
    }
}
