//! Daemon-side audit service: one background run at a time, latest result kept
//! for the reporting endpoints.

use crate::orchestrator::AuditOrchestrator;
use crate::reporter::HealthReporter;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;
use vigil_shared::api::ProgressResponse;
use vigil_shared::{AuditEvent, AuditProgress, AuditResult, ModuleDescriptor, VigilError};

struct RunningAudit {
    run_id: Uuid,
    cancel: CancellationToken,
}

pub struct AuditService {
    orchestrator: AuditOrchestrator,
    reporter: RwLock<HealthReporter>,
    running: Mutex<Option<RunningAudit>>,
    progress: RwLock<Option<AuditProgress>>,
    last_error: RwLock<Option<String>>,
}

impl AuditService {
    pub fn new(orchestrator: AuditOrchestrator) -> Arc<Self> {
        Arc::new(Self {
            orchestrator,
            reporter: RwLock::new(HealthReporter::new()),
            running: Mutex::new(None),
            progress: RwLock::new(None),
            last_error: RwLock::new(None),
        })
    }

    pub fn modules(&self) -> Result<Vec<ModuleDescriptor>, VigilError> {
        self.orchestrator.source().list_modules()
    }

    /// Start a background audit and return its run id.
    ///
    /// Fails when a run is already in flight, or when the catalog cannot be
    /// read (checked up front so the caller hears about it directly).
    pub async fn start(self: &Arc<Self>) -> Result<Uuid, VigilError> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            return Err(VigilError::AuditInProgress(current.run_id.to_string()));
        }

        if let Err(e) = self.modules() {
            *self.last_error.write().await = Some(e.to_string());
            return Err(e);
        }

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *running = Some(RunningAudit {
            run_id,
            cancel: cancel.clone(),
        });
        *self.progress.write().await = None;
        drop(running);

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run_to_completion(run_id, cancel).await;
        });

        info!("Audit {} scheduled", run_id);
        Ok(run_id)
    }

    async fn run_to_completion(self: Arc<Self>, run_id: Uuid, cancel: CancellationToken) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

        let tracker = {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    if let AuditEvent::Progress(progress) = event {
                        *service.progress.write().await = Some(progress);
                    }
                }
            })
        };

        let outcome = self.orchestrator.execute(run_id, Some(&tx), &cancel).await;
        drop(tx);
        let _ = tracker.await;

        match outcome {
            Ok(result) => {
                self.reporter.write().await.publish(result);
                *self.last_error.write().await = None;
            }
            Err(e) => {
                error!("Audit {} failed: {}", run_id, e);
                *self.last_error.write().await = Some(e.to_string());
            }
        }

        *self.running.lock().await = None;
    }

    /// Request cancellation of the running audit; false when none is running
    pub async fn cancel(&self) -> bool {
        match self.running.lock().await.as_ref() {
            Some(current) => {
                info!("Audit {} cancellation requested", current.run_id);
                current.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn progress(&self) -> ProgressResponse {
        let running = self.running.lock().await;
        ProgressResponse {
            running: running.is_some(),
            run_id: running.as_ref().map(|r| r.run_id),
            progress: self.progress.read().await.clone(),
            last_error: self.last_error.read().await.clone(),
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Snapshot of the reporter over the latest completed run
    pub async fn reporter(&self) -> HealthReporter {
        self.reporter.read().await.clone()
    }

    pub async fn latest(&self) -> Option<Arc<AuditResult>> {
        self.reporter.read().await.latest()
    }
}
