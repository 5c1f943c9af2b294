use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{CommitRecord, Health, IngestReceipt, RepoMetrics, SummarySnapshot, Window};

/// Failure talking to the metrics API. Kept `Clone` so it can live in view state.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    pub fn url(&self) -> &str {
        match self {
            ApiError::Request { url, .. } | ApiError::Status { url, .. } | ApiError::Decode { url, .. } => url,
        }
    }
}

/// Endpoints of the habits metrics service.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    async fn fetch_summary(&self, window: Window) -> Result<SummarySnapshot, ApiError>;

    /// Asks the server to ingest new commits. The body is informational only.
    async fn trigger_ingest(&self) -> Result<IngestReceipt, ApiError>;

    async fn fetch_repo_metrics(&self, repo_id: i64, window: Window) -> Result<RepoMetrics, ApiError>;

    async fn fetch_repo_commits(
        &self,
        repo_id: i64,
        window: Window,
        limit: u32,
    ) -> Result<Vec<CommitRecord>, ApiError>;

    async fn health(&self) -> Result<Health, ApiError>;
}

pub struct HttpMetricsApi {
    client: Client,
    base: String,
}

impl HttpMetricsApi {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, anyhow::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = endpoint(&self.base, path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;
        decode(check_status(&url, response)?, &url).await
    }
}

#[async_trait]
impl MetricsApi for HttpMetricsApi {
    async fn fetch_summary(&self, window: Window) -> Result<SummarySnapshot, ApiError> {
        self.get_json(&format!("/metrics/summary?window={window}")).await
    }

    async fn trigger_ingest(&self) -> Result<IngestReceipt, ApiError> {
        let url = endpoint(&self.base, "/admin/ingest");
        debug!(%url, "POST");
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;
        let response = check_status(&url, response)?;
        // Success is the status code; a body we cannot read is still a success.
        Ok(response.json::<IngestReceipt>().await.unwrap_or_default())
    }

    async fn fetch_repo_metrics(&self, repo_id: i64, window: Window) -> Result<RepoMetrics, ApiError> {
        self.get_json(&format!("/repos/{repo_id}/metrics?window={window}")).await
    }

    async fn fetch_repo_commits(
        &self,
        repo_id: i64,
        window: Window,
        limit: u32,
    ) -> Result<Vec<CommitRecord>, ApiError> {
        self.get_json(&format!("/repos/{repo_id}/commits?window={window}&limit={limit}"))
            .await
    }

    async fn health(&self) -> Result<Health, ApiError> {
        self.get_json("/health").await
    }
}

/// Joins `base` and `path` with exactly one slash between them.
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn request_error(url: &str, e: reqwest::Error) -> ApiError {
    ApiError::Request {
        url: url.to_string(),
        message: e.to_string(),
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
    let body = response.bytes().await.map_err(|e| request_error(url, e))?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
