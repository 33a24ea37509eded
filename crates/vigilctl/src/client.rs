//! HTTP client for communicating with vigild

use anyhow::{anyhow, Context, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use vigil_shared::api::{
    CancelResponse, ErrorResponse, HealthResponse, ItemsQuery, ItemsResponse, ModulesResponse,
    ProgressResponse, RunAuditResponse,
};
use vigil_shared::AuditResult;

/// Client for the daemon's `/v1` API
pub struct DaemonClient {
    client: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Accepts `host:port` as well as a full URL
    pub fn for_address(addr: &str) -> Result<Self> {
        if addr.starts_with("http://") || addr.starts_with("https://") {
            Self::new(addr)
        } else {
            Self::new(format!("http://{}", addr))
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/v1/health").await
    }

    pub async fn modules(&self) -> Result<ModulesResponse> {
        self.get("/v1/modules").await
    }

    pub async fn progress(&self) -> Result<ProgressResponse> {
        self.get("/v1/audit/progress").await
    }

    /// Latest completed audit; `None` when the daemon has not finished one yet
    pub async fn latest(&self) -> Result<Option<AuditResult>> {
        let response = self.send(self.client.get(self.url("/v1/audit/latest"))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(response).await.map(Some)
    }

    pub async fn items(&self, query: &ItemsQuery) -> Result<ItemsResponse> {
        let request = self.client.get(self.url("/v1/audit/items")).query(query);
        decode(self.send(request).await?).await
    }

    pub async fn run_audit(&self) -> Result<RunAuditResponse> {
        decode(self.send(self.client.post(self.url("/v1/audit/run"))).await?).await
    }

    pub async fn cancel(&self) -> Result<CancelResponse> {
        decode(self.send(self.client.post(self.url("/v1/audit/cancel"))).await?).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        decode(self.send(self.client.get(self.url(path))).await?).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| {
            anyhow!(
                "Cannot reach vigild at {}: {}\n\n\
                 Is the daemon running? Start it with:\n\
                 vigild",
                self.base_url,
                e
            )
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .context("Unexpected response from vigild");
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => Err(anyhow!("vigild returned {}: {}", status, error.message)),
        Err(_) if body.is_empty() => Err(anyhow!("vigild returned {}", status)),
        Err(_) => Err(anyhow!("vigild returned {}: {}", status, body)),
    }
}
