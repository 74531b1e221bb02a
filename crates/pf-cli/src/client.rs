//! HTTP client for the orchestrator's status API

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Response, StatusCode};

use pf_core::api::{CancelResponse, ErrorResponse, HealthResponse, StatusReport, SubmitResponse};
use pf_core::{InstallJob, InstallationId};

/// Per-request budget
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a running orchestrator
pub struct OrchestratorClient {
    base_url: String,
    http: reqwest::Client,
}

impl OrchestratorClient {
    /// Create a client for `server` (`host:port` or a full `http://` URL)
    pub fn new(server: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url(server),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the daemon is up
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .with_context(|| not_running(&self.base_url))?;
        decode(response).await
    }

    /// Submit a job; returns the new installation's id
    pub async fn submit(&self, job: &InstallJob) -> Result<InstallationId> {
        let response = self
            .http
            .post(format!("{}/api/installations", self.base_url))
            .json(job)
            .send()
            .await
            .with_context(|| not_running(&self.base_url))?;
        let submitted: SubmitResponse = decode(response).await?;
        Ok(submitted.id)
    }

    /// Current record and most recent log entries
    pub async fn status(&self, id: InstallationId) -> Result<StatusReport> {
        let response = self
            .http
            .get(format!("{}/api/installations/{}", self.base_url, id))
            .send()
            .await
            .with_context(|| not_running(&self.base_url))?;
        decode(response).await
    }

    /// Ask the daemon to cancel a running installation
    pub async fn cancel(&self, id: InstallationId) -> Result<bool> {
        let response = self
            .http
            .post(format!("{}/api/installations/{}/cancel", self.base_url, id))
            .send()
            .await
            .with_context(|| not_running(&self.base_url))?;
        let cancelled: CancelResponse = decode(response).await?;
        Ok(cancelled.cancelled)
    }
}

fn not_running(base_url: &str) -> String {
    format!("Failed to reach orchestrator at {}. Is it running?", base_url)
}

/// Decode a JSON body, turning error responses into readable errors
async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .context("Failed to decode orchestrator response");
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    match status {
        StatusCode::NOT_FOUND => Err(anyhow!("Not found: {}", message)),
        _ => Err(anyhow!("Orchestrator returned {}: {}", status.as_u16(), message)),
    }
}

/// Normalise `host:port` into an `http://` base URL without a trailing slash
pub fn base_url(server: &str) -> String {
    let server = server.trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("http://{}", server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("127.0.0.1:4000"), "http://127.0.0.1:4000");
        assert_eq!(base_url("http://panel.local:4000/"), "http://panel.local:4000");
        assert_eq!(base_url("https://example.com"), "https://example.com");
    }
}
