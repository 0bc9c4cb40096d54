use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::models::Dataset;
use std::time::Duration;

pub mod bcra;
pub mod table;

#[async_trait]
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_data(&self, series_id: &str) -> Result<Dataset>;
}

pub(crate) fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Reads a text resource from a local path or an http(s) URL.
pub(crate) async fn read_text(client: &reqwest::Client, location: &str) -> Result<String> {
    if is_remote(location) {
        let resp = client.get(location).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("HTTP {} while fetching {}", resp.status(), location));
        }
        Ok(resp.text().await?)
    } else {
        tokio::fs::read_to_string(location)
            .await
            .map_err(|e| anyhow!("Failed to read '{}': {}", location, e))
    }
}

pub(crate) fn build_client(timeout_secs: u64, accept_invalid_certs: bool) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("EconDashboards/1.0")
        .timeout(Duration::from_secs(timeout_secs))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
