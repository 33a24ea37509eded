//! Repair subsystem for modules found unhealthy
//!
//! Repairs are only attempted for broken or partially working modules. The
//! built-in repairer simulates remediation; it has no side effects, so
//! attempting the same repair twice cannot double-apply anything.

mod guard;

pub use guard::GuardedRepairer;

use crate::chance::Chance;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use vigil_shared::{DiagnosticItem, ModuleStatus, VigilError};

/// Default success chance for a partially working module
pub const DEFAULT_PARTIAL_SUCCESS: f64 = 0.90;

/// Default success chance for a broken module
pub const DEFAULT_BROKEN_SUCCESS: f64 = 0.70;

/// Automated remediation for one diagnostic item.
///
/// `Ok(true)` means repaired. `Err` is a failed attempt; the caller records it
/// on the item and moves on.
#[async_trait]
pub trait Repairer: Send + Sync {
    async fn attempt_repair(&self, item: &DiagnosticItem) -> Result<bool>;
}

/// Simulated repairer whose outcome depends on the starting status
pub struct SimulatedRepairer {
    chance: Arc<dyn Chance>,
    partial_success: f64,
    broken_success: f64,
    delay: Duration,
}

impl SimulatedRepairer {
    pub fn new(chance: Arc<dyn Chance>) -> Self {
        Self {
            chance,
            partial_success: DEFAULT_PARTIAL_SUCCESS,
            broken_success: DEFAULT_BROKEN_SUCCESS,
            delay: Duration::ZERO,
        }
    }

    pub fn with_probabilities(mut self, partial_success: f64, broken_success: f64) -> Self {
        self.partial_success = partial_success;
        self.broken_success = broken_success;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Success chance for an item starting in `status`
    pub fn success_probability(&self, status: ModuleStatus) -> Option<f64> {
        match status {
            ModuleStatus::PartiallyWorking => Some(self.partial_success),
            ModuleStatus::Broken => Some(self.broken_success),
            _ => None,
        }
    }
}

#[async_trait]
impl Repairer for SimulatedRepairer {
    async fn attempt_repair(&self, item: &DiagnosticItem) -> Result<bool> {
        let probability = self.success_probability(item.status).ok_or_else(|| {
            VigilError::Repair(format!("{} is {}, nothing to repair", item.id, item.status))
        })?;

        debug!("  Repairing {} ({}, p={:.2})", item.id, item.status, probability);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let repaired = self.chance.roll(probability);
        info!(
            "  Repair of {} {}",
            item.id,
            if repaired { "succeeded" } else { "failed" }
        );
        Ok(repaired)
    }
}
