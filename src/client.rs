//! HTTP client for a running checks server.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::dashboard::SummaryResponse;
use crate::models::StuckReport;
use crate::report::ReportSource;
use crate::server::SUMMARY_PATH;
use crate::stage::Stage;

#[derive(Clone)]
pub struct ChecksClient {
    base_url: String,
    http: reqwest::Client,
}

impl ChecksClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("GET {} returned {}", url, status);
        }
        let body = resp
            .json::<T>()
            .await
            .with_context(|| format!("invalid response body from {}", url))?;
        Ok(body)
    }

    /// Fetch one stage's report. Non-2xx responses are errors.
    pub async fn fetch_report(&self, stage: Stage) -> Result<StuckReport> {
        self.get_json(&stage.route()).await
    }

    /// Fetch the server-side summary across all stages.
    pub async fn fetch_summary(&self) -> Result<SummaryResponse> {
        self.get_json(SUMMARY_PATH).await
    }
}

#[async_trait]
impl ReportSource for ChecksClient {
    async fn fetch(&self, stage: Stage) -> Result<StuckReport> {
        self.fetch_report(stage).await
    }
}
