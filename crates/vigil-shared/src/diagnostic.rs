//! Per-module diagnostic items produced by one audit run.

use crate::module::{Category, ModuleDescriptor, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a module within one audit run.
///
/// `pending -> probing -> (working | partially_working | broken | missing | incomplete)`,
/// then optionally `fixing -> (working | unchanged)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    Pending,
    Probing,
    Working,
    PartiallyWorking,
    Broken,
    Missing,
    Incomplete,
    Fixing,
}

impl ModuleStatus {
    /// States a module may end a run in
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Working | Self::PartiallyWorking | Self::Broken | Self::Missing | Self::Incomplete
        )
    }

    /// States for which an automated repair makes sense
    pub fn is_repairable(&self) -> bool {
        matches!(self, Self::Broken | Self::PartiallyWorking)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Probing => "probing",
            Self::Working => "working",
            Self::PartiallyWorking => "partially_working",
            Self::Broken => "broken",
            Self::Missing => "missing",
            Self::Incomplete => "incomplete",
            Self::Fixing => "fixing",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ModuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "probing" => Ok(Self::Probing),
            "working" => Ok(Self::Working),
            "partially_working" | "partial" => Ok(Self::PartiallyWorking),
            "broken" => Ok(Self::Broken),
            "missing" => Ok(Self::Missing),
            "incomplete" => Ok(Self::Incomplete),
            "fixing" => Ok(Self::Fixing),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Probe-time judgement of how serious a finding is.
///
/// Distinct from the module's static [`Priority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    /// Severity for a module of `priority` ending a probe in `status`
    pub fn assess(status: ModuleStatus, priority: Priority) -> Self {
        match status {
            ModuleStatus::Broken => match priority {
                Priority::Critical | Priority::High => Severity::Critical,
                _ => Severity::Warning,
            },
            ModuleStatus::Missing => match priority {
                Priority::Critical => Severity::Critical,
                _ => Severity::Warning,
            },
            ModuleStatus::PartiallyWorking => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Findings for one module in one audit run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Stable id derived from the module name
    pub id: String,
    pub name: String,
    pub category: Category,
    pub priority: Priority,
    pub severity: Severity,
    pub description: String,
    /// Route or component the findings refer to
    pub location: String,
    pub status: ModuleStatus,
    /// False only when the route probe reported the module absent
    pub exists: bool,
    /// Decided at detection time, before any repair
    pub auto_fixable: bool,
    pub issues: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_attempted: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repair_successful: Option<bool>,

    pub last_checked: DateTime<Utc>,
    pub duration_ms: u64,
}

impl DiagnosticItem {
    /// Fresh item for a module that has not been probed yet
    pub fn pending(module: &ModuleDescriptor) -> Self {
        let location = module
            .route
            .clone()
            .or_else(|| module.component_ref.clone())
            .unwrap_or_else(|| module.name.clone());

        Self {
            id: module.item_id(),
            name: module.name.clone(),
            category: module.category,
            priority: module.priority,
            severity: Severity::Info,
            description: format!("{} {}", module.category, module.name),
            location,
            status: ModuleStatus::Pending,
            exists: true,
            auto_fixable: false,
            issues: Vec::new(),
            repair_attempted: None,
            repair_successful: None,
            last_checked: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ModuleStatus::Working
    }

    /// Record the outcome of a repair attempt.
    ///
    /// A successful repair moves the item to `working` and clears its issues.
    /// A failed one leaves the pre-repair status in place.
    pub fn apply_repair(&mut self, pre_repair: ModuleStatus, success: bool) {
        self.repair_attempted = Some(true);
        self.repair_successful = Some(success);
        if success {
            self.status = ModuleStatus::Working;
            self.severity = Severity::Info;
            self.issues.clear();
        } else {
            self.status = pre_repair;
        }
    }
}
