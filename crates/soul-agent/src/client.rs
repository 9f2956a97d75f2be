//! Thin HTTP client for the daemon's loopback API, used by the CLI's
//! non-daemon subcommands.

use anyhow::{Context, Result};
use serde_json::Value;

pub struct DaemonClient {
    base_url: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("daemon not reachable at {url}"))?;
        let status = response.status();
        let body: Value = response.json().await.context("invalid daemon response")?;
        if !status.is_success() {
            anyhow::bail!("daemon error ({status}): {body}");
        }
        Ok(body)
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("daemon not reachable at {url}"))?;
        let status = response.status();
        let body: Value = response.json().await.context("invalid daemon response")?;
        if !status.is_success() {
            anyhow::bail!("daemon error ({status}): {body}");
        }
        Ok(body)
    }
}
