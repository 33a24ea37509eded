//! Audit orchestrator - runs one full pass over the module catalog.
//!
//! Each module goes `pending -> probing -> <status>` and, when the status is
//! repairable and the item auto-fixable, through `fixing -> working | <status>`.
//! With the default `concurrency` of 1 modules are walked one by one: module
//! *i+1* is not started before module *i* has been probed, repaired and
//! reported. Wider settings feed an ordered buffer that probes in parallel
//! but results are still consumed here, one at a time, in catalog order, so
//! the accumulating result has a single writer.

use crate::chance::{Chance, RandomChance};
use crate::config::Config;
use crate::health::{ComponentChecks, HttpRouteProbe, ModuleProber};
use crate::registry::{CatalogFile, ModuleRegistry, ModuleSource};
use crate::repair::{GuardedRepairer, Repairer, SimulatedRepairer};
use anyhow::Context;
use chrono::Utc;
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;
use vigil_shared::{
    AuditEvent, AuditProgress, AuditResult, DiagnosticItem, ModuleDescriptor, VigilError,
};

pub struct AuditOrchestrator {
    source: Arc<dyn ModuleSource>,
    prober: ModuleProber,
    repairer: Option<Arc<dyn Repairer>>,
    concurrency: usize,
}

impl AuditOrchestrator {
    pub fn new(
        source: Arc<dyn ModuleSource>,
        prober: ModuleProber,
        repairer: Option<Arc<dyn Repairer>>,
    ) -> Self {
        Self {
            source,
            prober,
            repairer,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Wire up the HTTP prober, endpoint checks, catalog and repairer from config
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        let timeout = Duration::from_millis(config.probe.timeout_ms);
        let chance: Arc<dyn Chance> = Arc::new(RandomChance::new(config.probe.seed));

        let routes = HttpRouteProbe::new(config.probe.base_url.clone(), timeout)?;
        let checks = ComponentChecks::from_config(&config.checks, &config.probe.base_url, timeout)?;
        let prober = ModuleProber::new(Arc::new(routes), checks, chance.clone())
            .with_noise_probability(config.probe.noise_probability)
            .with_timeout(timeout);

        let source: Arc<dyn ModuleSource> = match &config.catalog_path {
            Some(path) => Arc::new(CatalogFile::new(path)),
            None => Arc::new(
                ModuleRegistry::from_config(&config.modules).context("Invalid module catalog")?,
            ),
        };

        let repairer: Option<Arc<dyn Repairer>> = if config.repair.enabled {
            let simulated = SimulatedRepairer::new(chance)
                .with_probabilities(
                    config.repair.partial_success_probability,
                    config.repair.broken_success_probability,
                )
                .with_delay(Duration::from_millis(config.repair.simulated_delay_ms));
            Some(Arc::new(GuardedRepairer::new(Arc::new(simulated))))
        } else {
            None
        };

        Ok(Self::new(source, prober, repairer).with_concurrency(config.audit.concurrency))
    }

    pub fn source(&self) -> Arc<dyn ModuleSource> {
        self.source.clone()
    }

    /// Run an audit without progress reporting or cancellation
    pub async fn run(&self) -> Result<AuditResult, VigilError> {
        self.run_with(None, &CancellationToken::new()).await
    }

    /// Run an audit, reporting events and honouring `cancel` between modules.
    ///
    /// Only a catalog failure is returned as an error. A cancelled run still
    /// yields a frozen result holding the modules finished so far.
    pub async fn run_with(
        &self,
        events: Option<&UnboundedSender<AuditEvent>>,
        cancel: &CancellationToken,
    ) -> Result<AuditResult, VigilError> {
        self.execute(Uuid::new_v4(), events, cancel).await
    }

    /// Same as [`run_with`](Self::run_with) under a caller-chosen run id
    pub async fn execute(
        &self,
        run_id: Uuid,
        events: Option<&UnboundedSender<AuditEvent>>,
        cancel: &CancellationToken,
    ) -> Result<AuditResult, VigilError> {
        let start_time = Utc::now();

        let modules = self.source.list_modules().map_err(|e| {
            error!("Audit {} aborted, module catalog unavailable: {}", run_id, e);
            e
        })?;
        let total = modules.len();

        info!("Audit {} started: {} modules", run_id, total);
        emit(events, AuditEvent::Started { run_id, total });

        let prober = &self.prober;
        let repairer = self.repairer.as_deref();

        let mut items: Vec<DiagnosticItem> = Vec::with_capacity(total);
        if self.concurrency == 1 {
            for (index, module) in modules.iter().enumerate() {
                if cancel.is_cancelled() {
                    break;
                }
                let item = audit_module(prober, repairer, module, index, run_id, events).await;
                record(&mut items, item, run_id, total, events);
            }
        } else {
            // Items are owned here, closures over borrowed items make the run future non-Send
            let pipeline = futures::stream::iter(modules.into_iter().enumerate())
                .map(move |(index, module)| async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(audit_module(prober, repairer, &module, index, run_id, events).await)
                })
                .buffered(self.concurrency);
            futures::pin_mut!(pipeline);

            while let Some(Some(item)) = pipeline.next().await {
                record(&mut items, item, run_id, total, events);
            }
        }

        let cancelled = items.len() < total;
        if cancelled {
            warn!("Audit {} cancelled after {} of {} modules", run_id, items.len(), total);
            emit(
                events,
                AuditEvent::Cancelled {
                    run_id,
                    completed: items.len(),
                    total,
                },
            );
        }

        let result = AuditResult::from_items(run_id, total, items, start_time, Utc::now(), cancelled);
        let summary = result.summary();
        info!(
            "Audit {} finished in {}ms: {} (health {}%)",
            run_id, result.duration_ms, summary, summary.overall_health
        );
        emit(events, AuditEvent::Finished { run_id, summary });

        Ok(result)
    }
}

/// Probe one module and, when warranted, attempt its repair
async fn audit_module(
    prober: &ModuleProber,
    repairer: Option<&dyn Repairer>,
    module: &ModuleDescriptor,
    index: usize,
    run_id: Uuid,
    events: Option<&UnboundedSender<AuditEvent>>,
) -> DiagnosticItem {
    emit(
        events,
        AuditEvent::Probing {
            run_id,
            index,
            module: module.name.clone(),
        },
    );
    let mut item = prober.probe(module).await;

    let Some(repairer) = repairer else {
        return item;
    };
    if !(item.status.is_repairable() && item.auto_fixable) {
        return item;
    }

    emit(
        events,
        AuditEvent::Fixing {
            run_id,
            index,
            module: module.name.clone(),
        },
    );
    let pre_repair = item.status;

    match AssertUnwindSafe(repairer.attempt_repair(&item)).catch_unwind().await {
        Ok(Ok(repaired)) => item.apply_repair(pre_repair, repaired),
        Ok(Err(e)) => {
            warn!("  Repair of {} failed: {:#}", item.id, e);
            item.apply_repair(pre_repair, false);
            item.issues.push(format!("Repair failed: {:#}", e));
        }
        Err(_) => {
            warn!("  Repair of {} panicked", item.id);
            item.apply_repair(pre_repair, false);
            item.issues.push("Repair crashed".to_string());
        }
    }
    item
}

/// Append a finished item and report progress for it
fn record(
    items: &mut Vec<DiagnosticItem>,
    item: DiagnosticItem,
    run_id: Uuid,
    total: usize,
    events: Option<&UnboundedSender<AuditEvent>>,
) {
    let progress = AuditProgress::new(run_id, items.len() + 1, total, &item.name, item.status);
    info!(
        "  [{}/{}] {}: {}",
        progress.completed, total, item.name, item.status
    );
    items.push(item);
    emit(events, AuditEvent::Progress(progress));
}

fn emit(events: Option<&UnboundedSender<AuditEvent>>, event: AuditEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching any more
        let _ = tx.send(event);
    }
}
