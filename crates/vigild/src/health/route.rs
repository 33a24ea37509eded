//! Route existence probes

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// What a route existence check observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Route answered with a non-error status
    Found { status: u16 },
    /// 404-class answer: the route does not exist
    NotFound { status: u16 },
    /// Route exists but the server failed to serve it
    ServerError { status: u16 },
    /// Connection refused, DNS failure, TLS failure and the like
    Unreachable(String),
    TimedOut { after_ms: u64 },
}

/// Lightweight existence check against an application route
#[async_trait]
pub trait RouteProbe: Send + Sync {
    async fn check(&self, route: &str) -> RouteOutcome;
}

/// HEAD-request route probe over HTTP
pub struct HttpRouteProbe {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRouteProbe {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("vigild/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Resolve a route against the base URL; absolute URLs pass through
    pub fn url_for(&self, route: &str) -> String {
        join_url(&self.base_url, route)
    }
}

/// Join `path` onto `base`, leaving absolute http(s) URLs untouched
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Classify an HTTP status for a route probe
pub fn classify_status(status: u16) -> RouteOutcome {
    match status {
        404 | 410 => RouteOutcome::NotFound { status },
        s if s >= 500 => RouteOutcome::ServerError { status },
        _ => RouteOutcome::Found { status },
    }
}

#[async_trait]
impl RouteProbe for HttpRouteProbe {
    async fn check(&self, route: &str) -> RouteOutcome {
        let url = self.url_for(route);
        debug!("  HEAD {}", url);

        match self.client.head(&url).send().await {
            Ok(response) => classify_status(response.status().as_u16()),
            Err(e) if e.is_timeout() => RouteOutcome::TimedOut {
                after_ms: self.timeout.as_millis() as u64,
            },
            Err(e) => RouteOutcome::Unreachable(e.to_string()),
        }
    }
}
