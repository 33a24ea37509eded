//! Properties that must hold for every audit run, checked across seeds.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vigil_shared::{AuditEvent, AuditResult, ModuleStatus};
use vigild::chance::{Chance, RandomChance};
use vigild::health::{ComponentChecks, ModuleProber, RouteOutcome, RouteProbe};
use vigild::registry::{ModuleRegistry, ModuleSource};
use vigild::repair::{Repairer, SimulatedRepairer};
use vigild::AuditOrchestrator;

/// Route outcomes drawn from the shared generator
struct FlakyRoutes {
    chance: Arc<dyn Chance>,
}

#[async_trait]
impl RouteProbe for FlakyRoutes {
    async fn check(&self, _route: &str) -> RouteOutcome {
        if self.chance.roll(0.15) {
            RouteOutcome::NotFound { status: 404 }
        } else if self.chance.roll(0.15) {
            RouteOutcome::ServerError { status: 500 }
        } else {
            RouteOutcome::Found { status: 200 }
        }
    }
}

fn orchestrator(seed: u64, concurrency: usize) -> AuditOrchestrator {
    let chance: Arc<dyn Chance> = Arc::new(RandomChance::seeded(seed));
    let routes = FlakyRoutes {
        chance: chance.clone(),
    };
    let prober = ModuleProber::new(Arc::new(routes), ComponentChecks::new(), chance.clone())
        .with_noise_probability(0.3);
    let repairer: Arc<dyn Repairer> = Arc::new(SimulatedRepairer::new(chance));
    AuditOrchestrator::new(Arc::new(ModuleRegistry::builtin()), prober, Some(repairer))
        .with_concurrency(concurrency)
}

async fn run_collecting(orchestrator: &AuditOrchestrator) -> (AuditResult, Vec<AuditEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = orchestrator
        .run_with(Some(&tx), &CancellationToken::new())
        .await
        .unwrap();
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

#[tokio::test]
async fn counts_and_health_stay_in_bounds() {
    for seed in 0..25 {
        let result = orchestrator(seed, 1).run().await.unwrap();
        assert!(result.working + result.broken + result.missing <= result.total_modules);
        assert!(result.overall_health_percent() <= 100);
        assert_eq!(result.modules.len(), result.total_modules);
        assert!(result.modules.iter().all(|m| m.status.is_terminal()));
    }
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_100() {
    for concurrency in [1, 4] {
        let (result, events) = run_collecting(&orchestrator(7, concurrency)).await;

        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| e.as_progress().map(|p| p.percent))
            .collect();
        assert_eq!(percents.len(), result.total_modules);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
        assert_eq!(percents.last(), Some(&100));

        assert!(matches!(events.first(), Some(AuditEvent::Started { .. })));
        assert!(matches!(events.last(), Some(AuditEvent::Finished { .. })));
        assert!(events.iter().all(|e| e.run_id() == result.run_id));
    }
}

#[tokio::test]
async fn repairs_only_follow_unhealthy_probes() {
    for seed in 0..25 {
        let (result, events) = run_collecting(&orchestrator(seed, 1)).await;

        for item in &result.modules {
            if item.repair_attempted.is_some() {
                assert!(item.auto_fixable, "{} repaired but not auto-fixable", item.id);
                assert!(matches!(
                    item.status,
                    ModuleStatus::Working | ModuleStatus::Broken | ModuleStatus::PartiallyWorking
                ));
            } else {
                assert!(
                    !(item.auto_fixable && item.status.is_repairable()),
                    "{} should have been repaired",
                    item.id
                );
            }
            if item.status == ModuleStatus::Missing || item.status == ModuleStatus::Incomplete {
                assert_eq!(item.repair_attempted, None);
            }
        }

        let fixing = events
            .iter()
            .filter(|e| matches!(e, AuditEvent::Fixing { .. }))
            .count();
        let attempted = result
            .modules
            .iter()
            .filter(|m| m.repair_attempted.is_some())
            .count();
        assert_eq!(fixing, attempted);
    }
}

#[tokio::test]
async fn result_order_matches_catalog_order() {
    let expected: Vec<String> = ModuleRegistry::builtin()
        .list_modules()
        .unwrap()
        .iter()
        .map(|m| m.item_id())
        .collect();

    for concurrency in [1, 3, 8] {
        let result = orchestrator(11, concurrency).run().await.unwrap();
        let ids: Vec<String> = result.modules.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, expected, "concurrency {}", concurrency);
    }
}

#[tokio::test]
async fn same_seed_gives_same_statuses() {
    let statuses = |result: AuditResult| -> Vec<ModuleStatus> {
        result.modules.iter().map(|m| m.status).collect()
    };
    let first = statuses(orchestrator(42, 1).run().await.unwrap());
    let second = statuses(orchestrator(42, 1).run().await.unwrap());
    assert_eq!(first, second);
}
