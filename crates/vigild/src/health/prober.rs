//! Module prober - turns a module descriptor into a diagnostic item.
//!
//! Probing never fails to the caller. Route failures, check errors, timeouts
//! and even panics inside a check end up as issues on the returned item.

use super::checks::{CheckOutcome, ComponentChecks};
use super::route::{RouteOutcome, RouteProbe};
use crate::chance::Chance;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use vigil_shared::{DiagnosticItem, ModuleDescriptor, ModuleStatus, Severity};

/// Issue attached when residual noise downgrades a healthy module
pub const MINOR_PERFORMANCE_ISSUE: &str = "Minor performance issue detected";

/// Default chance of residual noise
pub const DEFAULT_NOISE_PROBABILITY: f64 = 0.10;

/// Default bound on one route probe or component check
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// What the individual checks found, before severity and bookkeeping
#[derive(Debug)]
struct Findings {
    status: ModuleStatus,
    exists: bool,
    issues: Vec<String>,
}

impl Findings {
    fn new() -> Self {
        Self {
            status: ModuleStatus::Working,
            exists: true,
            issues: Vec::new(),
        }
    }

    fn broken(issue: String) -> Self {
        Self {
            status: ModuleStatus::Broken,
            exists: true,
            issues: vec![issue],
        }
    }
}

pub struct ModuleProber {
    routes: Arc<dyn RouteProbe>,
    checks: ComponentChecks,
    chance: Arc<dyn Chance>,
    noise_probability: f64,
    timeout: Duration,
}

impl ModuleProber {
    pub fn new(routes: Arc<dyn RouteProbe>, checks: ComponentChecks, chance: Arc<dyn Chance>) -> Self {
        Self {
            routes,
            checks,
            chance,
            noise_probability: DEFAULT_NOISE_PROBABILITY,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_noise_probability(mut self, probability: f64) -> Self {
        self.noise_probability = probability.clamp(0.0, 1.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Probe one module and return its fully populated diagnostic item
    pub async fn probe(&self, module: &ModuleDescriptor) -> DiagnosticItem {
        let start = Instant::now();
        let mut item = DiagnosticItem::pending(module);
        item.status = ModuleStatus::Probing;

        let findings = match AssertUnwindSafe(self.inspect(module)).catch_unwind().await {
            Ok(findings) => findings,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("  Probe of {} panicked: {}", module.name, message);
                Findings::broken(format!("Probe crashed: {}", message))
            }
        };

        item.status = findings.status;
        item.exists = findings.exists;
        item.issues = findings.issues;
        item.severity = Severity::assess(item.status, module.priority);
        item.auto_fixable = module.auto_fix && item.status.is_repairable();
        item.description = describe(&module.name, item.status);
        item.last_checked = Utc::now();
        item.duration_ms = start.elapsed().as_millis() as u64;

        debug!(
            "  Probed {}: {} ({} issues)",
            module.name,
            item.status,
            item.issues.len()
        );
        item
    }

    async fn inspect(&self, module: &ModuleDescriptor) -> Findings {
        let mut findings = Findings::new();

        if module.incomplete {
            findings.status = ModuleStatus::Incomplete;
            findings
                .issues
                .push("Module is marked incomplete in the catalog".to_string());
            return findings;
        }

        if let Some(route) = &module.route {
            self.probe_route(route, &mut findings).await;
        }

        if let Some(component) = &module.component_ref {
            if findings.exists {
                self.run_component_check(component, &mut findings).await;
            }
        }

        if findings.status == ModuleStatus::Working && self.chance.roll(self.noise_probability) {
            findings.status = ModuleStatus::PartiallyWorking;
            findings.issues.push(MINOR_PERFORMANCE_ISSUE.to_string());
        }

        findings
    }

    async fn probe_route(&self, route: &str, findings: &mut Findings) {
        let outcome = match tokio::time::timeout(self.timeout, self.routes.check(route)).await {
            Ok(outcome) => outcome,
            Err(_) => RouteOutcome::TimedOut {
                after_ms: self.timeout.as_millis() as u64,
            },
        };

        match outcome {
            RouteOutcome::Found { .. } => {}
            RouteOutcome::NotFound { status } => {
                findings.exists = false;
                findings.status = ModuleStatus::Missing;
                findings
                    .issues
                    .push(format!("Route {} not found (HTTP {})", route, status));
            }
            RouteOutcome::ServerError { status } => {
                findings.status = ModuleStatus::Broken;
                findings
                    .issues
                    .push(format!("Route {} failed with HTTP {}", route, status));
            }
            RouteOutcome::Unreachable(reason) => {
                findings.status = ModuleStatus::Broken;
                findings
                    .issues
                    .push(format!("Route {} unreachable: {}", route, reason));
            }
            RouteOutcome::TimedOut { after_ms } => {
                findings.status = ModuleStatus::Broken;
                findings
                    .issues
                    .push(format!("Route {} timed out after {}ms", route, after_ms));
            }
        }
    }

    async fn run_component_check(&self, component: &str, findings: &mut Findings) {
        let Some(check) = self.checks.get(component) else {
            debug!("  No custom check for component {}", component);
            return;
        };

        let outcome = match tokio::time::timeout(self.timeout, check.check()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => CheckOutcome::Failed(vec![format!(
                "Health check for {} failed: {:#}",
                component, e
            )]),
            Err(_) => CheckOutcome::Failed(vec![format!(
                "Health check for {} timed out after {}ms",
                component,
                self.timeout.as_millis()
            )]),
        };

        match outcome {
            CheckOutcome::Healthy => {}
            CheckOutcome::Degraded(issues) => {
                if findings.status == ModuleStatus::Working {
                    findings.status = ModuleStatus::PartiallyWorking;
                }
                findings.issues.extend(issues);
            }
            CheckOutcome::Failed(issues) => {
                findings.status = ModuleStatus::Broken;
                findings.issues.extend(issues);
            }
        }
    }
}

fn describe(name: &str, status: ModuleStatus) -> String {
    match status {
        ModuleStatus::Working => format!("{} is operating normally", name),
        ModuleStatus::PartiallyWorking => format!("{} is working with minor issues", name),
        ModuleStatus::Broken => format!("{} is not working", name),
        ModuleStatus::Missing => format!("{} could not be found", name),
        ModuleStatus::Incomplete => format!("{} is incomplete", name),
        other => format!("{} is {}", name, other),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::FixedChance;
    use crate::health::checks::ComponentCheck;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use vigil_shared::{Category, Priority};

    struct StubRoutes(HashMap<String, RouteOutcome>);

    #[async_trait]
    impl RouteProbe for StubRoutes {
        async fn check(&self, route: &str) -> RouteOutcome {
            self.0
                .get(route)
                .cloned()
                .unwrap_or(RouteOutcome::Found { status: 200 })
        }
    }

    struct SlowRoutes;

    #[async_trait]
    impl RouteProbe for SlowRoutes {
        async fn check(&self, _route: &str) -> RouteOutcome {
            tokio::time::sleep(Duration::from_secs(60)).await;
            RouteOutcome::Found { status: 200 }
        }
    }

    struct PanickingCheck;

    #[async_trait]
    impl ComponentCheck for PanickingCheck {
        async fn check(&self) -> Result<CheckOutcome> {
            panic!("cache index corrupted");
        }
    }

    struct ErrorCheck;

    #[async_trait]
    impl ComponentCheck for ErrorCheck {
        async fn check(&self) -> Result<CheckOutcome> {
            anyhow::bail!("bot token rejected")
        }
    }

    fn prober(routes: Vec<(&str, RouteOutcome)>, checks: ComponentChecks) -> ModuleProber {
        let routes = routes
            .into_iter()
            .map(|(r, o)| (r.to_string(), o))
            .collect();
        ModuleProber::new(Arc::new(StubRoutes(routes)), checks, Arc::new(FixedChance::never()))
    }

    #[tokio::test]
    async fn test_found_route_is_working() {
        let module = ModuleDescriptor::new("Home", Priority::Critical, Category::Page).with_route("/");
        let item = prober(vec![], ComponentChecks::new()).probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Working);
        assert!(item.exists);
        assert!(item.issues.is_empty());
        assert_eq!(item.severity, Severity::Info);
        assert!(!item.auto_fixable);
    }

    #[tokio::test]
    async fn test_not_found_is_missing() {
        let module = ModuleDescriptor::new("Reviews", Priority::Critical, Category::Page)
            .with_route("/reviews")
            .with_component("review-form");
        let checks = ComponentChecks::new().with("review-form", Arc::new(PanickingCheck));
        let item = prober(vec![("/reviews", RouteOutcome::NotFound { status: 404 })], checks)
            .probe(&module)
            .await;
        assert_eq!(item.status, ModuleStatus::Missing);
        assert!(!item.exists);
        assert_eq!(item.severity, Severity::Critical);
        // The component check is skipped for absent modules
        assert_eq!(item.issues, vec!["Route /reviews not found (HTTP 404)".to_string()]);
        assert!(!item.auto_fixable);
    }

    #[tokio::test]
    async fn test_transport_failure_is_broken() {
        let module =
            ModuleDescriptor::new("Analytics", Priority::Medium, Category::Page).with_route("/analytics");
        let item = prober(
            vec![("/analytics", RouteOutcome::Unreachable("connection refused".into()))],
            ComponentChecks::new(),
        )
        .probe(&module)
        .await;
        assert_eq!(item.status, ModuleStatus::Broken);
        assert!(item.exists);
        assert!(item.issues[0].contains("unreachable"));
        assert!(item.auto_fixable);
    }

    #[tokio::test]
    async fn test_check_error_is_broken() {
        let module = ModuleDescriptor::new("AI Assistant Bot", Priority::High, Category::Component)
            .with_component("bot");
        let checks = ComponentChecks::new().with("bot", Arc::new(ErrorCheck));
        let item = prober(vec![], checks).probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Broken);
        assert_eq!(item.severity, Severity::Critical);
        assert!(item.issues[0].contains("bot token rejected"));
    }

    #[tokio::test]
    async fn test_panicking_check_is_captured() {
        let module = ModuleDescriptor::new("Response Cache", Priority::Medium, Category::Component)
            .with_component("cache");
        let checks = ComponentChecks::new().with("cache", Arc::new(PanickingCheck));
        let item = prober(vec![], checks).probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Broken);
        assert!(item.issues[0].contains("cache index corrupted"));
    }

    #[tokio::test]
    async fn test_noise_downgrades_healthy_module() {
        let module = ModuleDescriptor::new("Home", Priority::Critical, Category::Page).with_route("/");
        let prober = ModuleProber::new(
            Arc::new(StubRoutes(HashMap::new())),
            ComponentChecks::new(),
            Arc::new(FixedChance::always()),
        );
        let item = prober.probe(&module).await;
        assert_eq!(item.status, ModuleStatus::PartiallyWorking);
        assert_eq!(item.issues, vec![MINOR_PERFORMANCE_ISSUE.to_string()]);
        assert_eq!(item.severity, Severity::Warning);
    }

    #[tokio::test]
    async fn test_noise_never_touches_unhealthy_module() {
        let module = ModuleDescriptor::new("Music", Priority::Low, Category::Page).with_route("/music");
        let prober = ModuleProber::new(
            Arc::new(StubRoutes(
                [("/music".to_string(), RouteOutcome::ServerError { status: 502 })].into(),
            )),
            ComponentChecks::new(),
            Arc::new(FixedChance::always()),
        );
        let item = prober.probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Broken);
        assert_eq!(item.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_page_without_route_is_working() {
        let module = ModuleDescriptor::new("Scholarships", Priority::Medium, Category::Page);
        let item = prober(vec![], ComponentChecks::new()).probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Working);
        assert!(item.issues.is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_module_skips_checks_and_noise() {
        let module = ModuleDescriptor::new("AI Assistant Bot", Priority::High, Category::Page)
            .with_component("bot")
            .incomplete();
        let checks = ComponentChecks::new().with("bot", Arc::new(ErrorCheck));
        let prober = ModuleProber::new(
            Arc::new(StubRoutes(HashMap::new())),
            checks,
            Arc::new(FixedChance::always()),
        );
        let item = prober.probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Incomplete);
        assert_eq!(item.severity, Severity::Info);
        assert_eq!(item.issues, vec!["Module is marked incomplete in the catalog".to_string()]);
        assert!(!item.auto_fixable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_route_times_out() {
        let module = ModuleDescriptor::new("Marketplace", Priority::High, Category::Page)
            .with_route("/marketplace");
        let prober = ModuleProber::new(
            Arc::new(SlowRoutes),
            ComponentChecks::new(),
            Arc::new(FixedChance::never()),
        )
        .with_timeout(Duration::from_millis(500));
        let item = prober.probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Broken);
        assert_eq!(item.issues, vec!["Route /marketplace timed out after 500ms".to_string()]);
    }

    #[tokio::test]
    async fn test_auto_fix_opt_out() {
        let module = ModuleDescriptor::new("Data Backend", Priority::Critical, Category::Integration)
            .with_component("backend")
            .without_auto_fix();
        let checks = ComponentChecks::new().with("backend", Arc::new(ErrorCheck));
        let item = prober(vec![], checks).probe(&module).await;
        assert_eq!(item.status, ModuleStatus::Broken);
        assert!(!item.auto_fixable);
    }
}
