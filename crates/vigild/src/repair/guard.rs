//! In-progress guard for repairers with real side effects

use super::Repairer;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::warn;
use vigil_shared::{DiagnosticItem, VigilError};

/// Rejects a second repair of an item while the first is still running
pub struct GuardedRepairer {
    inner: Arc<dyn Repairer>,
    in_progress: Mutex<HashSet<String>>,
}

impl GuardedRepairer {
    pub fn new(inner: Arc<dyn Repairer>) -> Self {
        Self {
            inner,
            in_progress: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_repairing(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.in_progress.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the in-progress mark even if the inner repair errors or is dropped
struct Release<'a> {
    guard: &'a GuardedRepairer,
    id: String,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        self.guard.lock().remove(&self.id);
    }
}

#[async_trait]
impl Repairer for GuardedRepairer {
    async fn attempt_repair(&self, item: &DiagnosticItem) -> Result<bool> {
        if !self.lock().insert(item.id.clone()) {
            warn!("  Repair of {} already in progress", item.id);
            return Err(VigilError::Repair(format!("repair of {} already in progress", item.id)).into());
        }
        let _release = Release {
            guard: self,
            id: item.id.clone(),
        };
        self.inner.attempt_repair(item).await
    }
}
