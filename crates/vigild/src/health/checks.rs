//! Component health checks, looked up by `component_ref`.
//!
//! Not every component has a check. An absent entry means "no custom check":
//! the module is judged on its route probe alone.

use super::route::join_url;
use crate::config::EndpointCheckConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Verdict of a component check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Healthy,
    /// Works, with the listed problems; the module is partially working
    Degraded(Vec<String>),
    /// Does not work; the module is broken
    Failed(Vec<String>),
}

/// Custom asynchronous health check for one component.
///
/// Returning `Err` counts as a failed check with the error as its issue.
#[async_trait]
pub trait ComponentCheck: Send + Sync {
    async fn check(&self) -> Result<CheckOutcome>;
}

/// Named lookup of component checks
#[derive(Clone, Default)]
pub struct ComponentChecks {
    checks: HashMap<String, Arc<dyn ComponentCheck>>,
}

impl ComponentChecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check, replacing any previous one under the same name
    pub fn register(&mut self, component: impl Into<String>, check: Arc<dyn ComponentCheck>) {
        self.checks.insert(component.into(), check);
    }

    pub fn with(mut self, component: impl Into<String>, check: Arc<dyn ComponentCheck>) -> Self {
        self.register(component, check);
        self
    }

    pub fn get(&self, component: &str) -> Option<Arc<dyn ComponentCheck>> {
        self.checks.get(component).cloned()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Build endpoint checks from config
    pub fn from_config(
        entries: &[EndpointCheckConfig],
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut checks = Self::new();
        for entry in entries {
            let url = join_url(base_url, &entry.url);
            let check = EndpointCheck::new(
                url,
                timeout,
                entry.degraded_latency_ms.map(Duration::from_millis),
            )
            .with_context(|| format!("Invalid check for component '{}'", entry.component))?;
            checks.register(entry.component.clone(), Arc::new(check));
        }
        Ok(checks)
    }
}

impl fmt::Debug for ComponentChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.checks.keys().collect();
        names.sort();
        f.debug_struct("ComponentChecks").field("components", &names).finish()
    }
}

/// Component check backed by an HTTP health endpoint
pub struct EndpointCheck {
    client: reqwest::Client,
    url: String,
    degraded_latency: Option<Duration>,
}

impl EndpointCheck {
    pub fn new(url: String, timeout: Duration, degraded_latency: Option<Duration>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url,
            degraded_latency,
        })
    }
}

#[async_trait]
impl ComponentCheck for EndpointCheck {
    async fn check(&self) -> Result<CheckOutcome> {
        let start = Instant::now();
        debug!("  GET {}", self.url);

        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(CheckOutcome::Failed(vec![format!(
                    "Health endpoint {} timed out",
                    self.url
                )]))
            }
            Err(e) => {
                return Ok(CheckOutcome::Failed(vec![format!(
                    "Health endpoint {} unreachable: {}",
                    self.url, e
                )]))
            }
        };

        let elapsed = start.elapsed();
        let status = response.status();

        if status.is_server_error() {
            return Ok(CheckOutcome::Failed(vec![format!(
                "Health endpoint {} returned HTTP {}",
                self.url,
                status.as_u16()
            )]));
        }
        if !status.is_success() {
            return Ok(CheckOutcome::Degraded(vec![format!(
                "Health endpoint {} returned HTTP {}",
                self.url,
                status.as_u16()
            )]));
        }

        match self.degraded_latency {
            Some(limit) if elapsed > limit => Ok(CheckOutcome::Degraded(vec![format!(
                "Health endpoint answered in {}ms (limit {}ms)",
                elapsed.as_millis(),
                limit.as_millis()
            )])),
            _ => Ok(CheckOutcome::Healthy),
        }
    }
}
