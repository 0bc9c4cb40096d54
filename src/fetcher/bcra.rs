use async_trait::async_trait;
use crate::config::AppConfig;
use crate::models::{DataPoint, Dataset};
use super::DataSource;
use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

/// Central bank monetary statistics (`/estadisticas/v3.0/monetarias/{id}`).
pub struct BcraFetcher {
    base_url: String,
    client: Client,
}

impl BcraFetcher {
    pub fn new(config: &AppConfig) -> Self {
        let client = super::build_client(config.http_timeout_secs, config.bcra_accept_invalid_certs);
        Self { base_url: config.bcra_base_url.clone(), client }
    }

    pub fn series_url(&self, series_id: &str) -> String {
        format!("{}/estadisticas/v3.0/monetarias/{}", self.base_url, series_id)
    }

    fn parse_observations(json: &Value) -> Result<Vec<DataPoint>> {
        let results = json["results"]
            .as_array()
            .ok_or_else(|| anyhow!("No results found in BCRA response"))?;

        let mut data_points = Vec::new();

        for obs in results {
            // { "fecha": "2024-01-02", "valor": 23073.0 }
            let Some(date_str) = obs["fecha"].as_str() else { continue };

            // Values come as numbers, older payloads sent strings
            let value = match &obs["valor"] {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let Some(value) = value else {
                debug!("BCRA: skipping {} without a numeric value", date_str);
                continue;
            };

            let naive_date = chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map_err(|e| anyhow!("Invalid BCRA date '{}': {}", date_str, e))?;
            let timestamp = naive_date.and_time(chrono::NaiveTime::MIN).and_utc();

            data_points.push(DataPoint::new(timestamp, value));
        }

        // The API returns newest first
        data_points.sort_by_key(|dp| dp.timestamp);

        Ok(data_points)
    }
}

#[async_trait]
impl DataSource for BcraFetcher {
    fn name(&self) -> &str {
        "bcra"
    }

    async fn fetch_data(&self, series_id: &str) -> Result<Dataset> {
        let url = self.series_url(series_id);
        info!("Fetching BCRA series {}: {}", series_id, url);

        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("BCRA API Error: {} - Body: {}", status, error_text));
        }

        let json: Value = resp.json().await?;
        let points = Self::parse_observations(&json)?;
        info!("BCRA series {}: {} observations", series_id, points.len());

        Ok(Dataset::from_points("valor", points))
    }
}
