//! Health reporter - read-only views over the latest completed audit.
//!
//! Before the first run completes every query returns an empty list or `None`.

use std::sync::Arc;
use vigil_shared::{
    AuditResult, Category, DiagnosticItem, HealthSummary, ModuleStatus, RecoverySummary, Severity,
};

#[derive(Debug, Clone, Default)]
pub struct HealthReporter {
    latest: Option<Arc<AuditResult>>,
}

impl HealthReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_result(result: AuditResult) -> Self {
        Self {
            latest: Some(Arc::new(result)),
        }
    }

    /// Replace the previous result entirely
    pub fn publish(&mut self, result: AuditResult) {
        self.latest = Some(Arc::new(result));
    }

    pub fn latest(&self) -> Option<Arc<AuditResult>> {
        self.latest.clone()
    }

    pub fn by_category(&self, category: Category) -> Vec<DiagnosticItem> {
        self.select(|item| item.category == category)
    }

    pub fn by_status(&self, status: ModuleStatus) -> Vec<DiagnosticItem> {
        self.select(|item| item.status == status)
    }

    pub fn by_severity(&self, severity: Severity) -> Vec<DiagnosticItem> {
        self.select(|item| item.severity == severity)
    }

    /// Items matching every given filter, in catalog order
    pub fn filter(
        &self,
        category: Option<Category>,
        status: Option<ModuleStatus>,
        severity: Option<Severity>,
    ) -> Vec<DiagnosticItem> {
        self.select(|item| {
            category.map_or(true, |c| item.category == c)
                && status.map_or(true, |s| item.status == s)
                && severity.map_or(true, |s| item.severity == s)
        })
    }

    pub fn overall_health_percent(&self) -> Option<u8> {
        self.latest.as_ref().map(|r| r.overall_health_percent())
    }

    pub fn summary(&self) -> Option<HealthSummary> {
        self.latest.as_ref().map(|r| r.summary())
    }

    pub fn recovery(&self) -> Option<RecoverySummary> {
        self.latest.as_ref().map(|r| r.recovery())
    }

    fn select(&self, keep: impl Fn(&DiagnosticItem) -> bool) -> Vec<DiagnosticItem> {
        match &self.latest {
            Some(result) => result.modules.iter().filter(|i| keep(i)).cloned().collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use vigil_shared::{ModuleDescriptor, Priority};

    fn item(name: &str, category: Category, status: ModuleStatus) -> DiagnosticItem {
        let module = ModuleDescriptor::new(name, Priority::High, category);
        let mut item = DiagnosticItem::pending(&module);
        item.status = status;
        item.severity = Severity::assess(status, Priority::High);
        item
    }

    fn reporter() -> HealthReporter {
        let items = vec![
            item("Home", Category::Page, ModuleStatus::Working),
            item("Bot", Category::Component, ModuleStatus::Broken),
            item("Reviews", Category::Page, ModuleStatus::Missing),
            item("Cache", Category::Component, ModuleStatus::PartiallyWorking),
        ];
        let now = Utc::now();
        HealthReporter::from_result(AuditResult::from_items(Uuid::new_v4(), 4, items, now, now, false))
    }

    #[test]
    fn test_empty_before_first_run() {
        let reporter = HealthReporter::new();
        assert!(reporter.by_status(ModuleStatus::Working).is_empty());
        assert!(reporter.by_category(Category::Page).is_empty());
        assert!(reporter.overall_health_percent().is_none());
        assert!(reporter.summary().is_none());
    }

    #[test]
    fn test_by_category_preserves_order() {
        let pages: Vec<String> = reporter()
            .by_category(Category::Page)
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(pages, vec!["Home", "Reviews"]);
    }

    #[test]
    fn test_projections_are_idempotent() {
        let reporter = reporter();
        assert_eq!(
            reporter.by_status(ModuleStatus::Working),
            reporter.by_status(ModuleStatus::Working)
        );
    }

    #[test]
    fn test_by_severity_and_combined_filter() {
        let reporter = reporter();
        assert_eq!(reporter.by_severity(Severity::Critical).len(), 1);
        assert_eq!(reporter.by_severity(Severity::Warning).len(), 2);

        let items = reporter.filter(Some(Category::Component), None, Some(Severity::Warning));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Cache");
    }

    #[test]
    fn test_publish_replaces_previous_result() {
        let mut reporter = reporter();
        let now = Utc::now();
        let fresh = vec![item("Home", Category::Page, ModuleStatus::Working)];
        reporter.publish(AuditResult::from_items(Uuid::new_v4(), 1, fresh, now, now, false));
        assert_eq!(reporter.overall_health_percent(), Some(100));
        assert!(reporter.by_status(ModuleStatus::Broken).is_empty());
    }
}
