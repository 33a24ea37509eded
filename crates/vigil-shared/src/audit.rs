//! Audit results and the aggregate views derived from them.

use crate::diagnostic::{DiagnosticItem, ModuleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Frozen outcome of one audit run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditResult {
    pub run_id: Uuid,
    /// Number of modules in the catalog when the run started
    pub total_modules: usize,
    pub working: usize,
    pub broken: usize,
    pub repaired: usize,
    pub missing: usize,
    pub partially_working: usize,
    pub incomplete: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    /// True when the run was stopped before every module was checked
    pub cancelled: bool,
    /// Items in catalog order
    pub modules: Vec<DiagnosticItem>,
}

impl AuditResult {
    /// Freeze a set of finished items into a result, computing all counters.
    pub fn from_items(
        run_id: Uuid,
        total_modules: usize,
        modules: Vec<DiagnosticItem>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        cancelled: bool,
    ) -> Self {
        let count = |status: ModuleStatus| modules.iter().filter(|m| m.status == status).count();

        let working = count(ModuleStatus::Working);
        let broken = count(ModuleStatus::Broken);
        let missing = count(ModuleStatus::Missing);
        let partially_working = count(ModuleStatus::PartiallyWorking);
        let incomplete = count(ModuleStatus::Incomplete);
        let repaired = modules
            .iter()
            .filter(|m| m.repair_successful == Some(true))
            .count();

        let duration_ms = (end_time - start_time).num_milliseconds().max(0) as u64;

        Self {
            run_id,
            total_modules,
            working,
            broken,
            repaired,
            missing,
            partially_working,
            incomplete,
            start_time,
            end_time,
            duration_ms,
            cancelled,
            modules,
        }
    }

    /// Share of modules that are working (repaired ones included), 0-100.
    ///
    /// An empty catalog has nothing unhealthy and reports 100.
    pub fn overall_health_percent(&self) -> u8 {
        if self.total_modules == 0 {
            return 100;
        }
        let healthy = self.working.min(self.total_modules);
        ((healthy as f64 / self.total_modules as f64) * 100.0).round() as u8
    }

    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            checked: self.modules.len(),
            total: self.total_modules,
            healthy: self.working,
            broken: self.broken,
            missing: self.missing,
            partially_working: self.partially_working,
            incomplete: self.incomplete,
            repaired: self.repaired,
            overall_health: self.overall_health_percent(),
            cancelled: self.cancelled,
        }
    }

    pub fn recovery(&self) -> RecoverySummary {
        let mut summary = RecoverySummary::default();
        for item in &self.modules {
            match item.repair_successful {
                Some(true) => {
                    summary.attempted += 1;
                    summary.succeeded += 1;
                }
                Some(false) => {
                    summary.attempted += 1;
                    summary.failed += 1;
                    summary.unrepaired.push(item.id.clone());
                }
                None => {
                    if item.status.is_repairable() {
                        summary.unrepaired.push(item.id.clone());
                    }
                }
            }
        }
        summary
    }

    pub fn item(&self, id: &str) -> Option<&DiagnosticItem> {
        self.modules.iter().find(|m| m.id == id)
    }
}

/// Headline numbers a dashboard can always render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub checked: usize,
    pub total: usize,
    pub healthy: usize,
    pub broken: usize,
    pub missing: usize,
    pub partially_working: usize,
    pub incomplete: usize,
    pub repaired: usize,
    pub overall_health: u8,
    pub cancelled: bool,
}

impl HealthSummary {
    pub fn has_failures(&self) -> bool {
        self.broken > 0 || self.missing > 0
    }
}

impl fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} checked, {} healthy, {} broken, {} repaired",
            self.checked, self.total, self.healthy, self.broken, self.repaired
        )
    }
}

/// Outcome of the automated repairs in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverySummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items still broken or partially working after the run
    pub unrepaired: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Category, ModuleDescriptor, Priority};

    fn finished(name: &str, status: ModuleStatus) -> DiagnosticItem {
        let module = ModuleDescriptor::new(name, Priority::Medium, Category::Feature);
        let mut item = DiagnosticItem::pending(&module);
        item.status = status;
        item
    }

    fn result(items: Vec<DiagnosticItem>) -> AuditResult {
        let now = Utc::now();
        let total = items.len();
        AuditResult::from_items(Uuid::new_v4(), total, items, now, now, false)
    }

    #[test]
    fn test_counts_and_health() {
        let mut repaired = finished("Cache", ModuleStatus::Fixing);
        repaired.apply_repair(ModuleStatus::Broken, true);

        let result = result(vec![
            finished("Home", ModuleStatus::Working),
            finished("Search", ModuleStatus::Broken),
            finished("Reviews", ModuleStatus::Missing),
            repaired,
        ]);

        assert_eq!(result.working, 2);
        assert_eq!(result.broken, 1);
        assert_eq!(result.missing, 1);
        assert_eq!(result.repaired, 1);
        assert_eq!(result.overall_health_percent(), 50);
        assert!(result.working + result.broken + result.missing <= result.total_modules);
    }

    #[test]
    fn test_health_rounds_to_nearest() {
        let result = result(vec![
            finished("A", ModuleStatus::Working),
            finished("B", ModuleStatus::Working),
            finished("C", ModuleStatus::Incomplete),
        ]);
        assert_eq!(result.overall_health_percent(), 67);
    }

    #[test]
    fn test_empty_catalog_is_fully_healthy() {
        assert_eq!(result(vec![]).overall_health_percent(), 100);
    }

    #[test]
    fn test_summary_line() {
        let result = result(vec![
            finished("Home", ModuleStatus::Working),
            finished("Search", ModuleStatus::Broken),
        ]);
        assert_eq!(
            result.summary().to_string(),
            "2 of 2 checked, 1 healthy, 1 broken, 0 repaired"
        );
        assert!(result.summary().has_failures());
    }

    #[test]
    fn test_recovery_lists_unrepaired() {
        let mut failed = finished("Bot", ModuleStatus::Fixing);
        failed.apply_repair(ModuleStatus::PartiallyWorking, false);

        let result = result(vec![
            failed,
            finished("Upload", ModuleStatus::Broken),
            finished("Home", ModuleStatus::Working),
        ]);
        let recovery = result.recovery();
        assert_eq!(recovery.attempted, 1);
        assert_eq!(recovery.failed, 1);
        assert_eq!(recovery.unrepaired, vec!["bot".to_string(), "upload".to_string()]);
    }
}
