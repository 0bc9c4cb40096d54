use crate::analysis::forecast::ForecastFrame;
use crate::analysis::listings::{self, PropertyType};
use crate::config::AppConfig;
use crate::core::cache::{CacheKey, DatasetCache};
use crate::core::rate_limiter::RateLimiter;
use crate::error::{DashboardError, Result};
use crate::fetcher::bcra::BcraFetcher;
use crate::fetcher::table::TableFetcher;
use crate::fetcher::{self, DataSource};
use crate::indicators::registry::{IndicatorMetadata, Registry, SourceType};
use crate::models::{Dataset, Listing};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Resolves indicators to their sources and loads them through the session cache.
pub struct Orchestrator {
    config: AppConfig,
    cache: DatasetCache,
    listings: DatasetCache<Vec<Listing>>,
    client: reqwest::Client,
}

impl Orchestrator {
    pub fn new(config: AppConfig) -> Self {
        let client = fetcher::build_client(config.http_timeout_secs, false);
        Self { config, cache: DatasetCache::new(), listings: DatasetCache::new(), client }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    /// Loads the raw dataset behind `slug`. Repeated calls share one fetch.
    pub async fn load_indicator(&self, slug: &str) -> Result<Arc<Dataset>> {
        let meta = Registry::get_metadata(slug)
            .ok_or_else(|| DashboardError::UnknownIndicator(slug.to_string()))?;

        let key = CacheKey::new(meta.source.label(), meta.source_params());
        let dataset = self
            .cache
            .get_or_load(key, || self.fetch(meta))
            .await?;

        Ok(dataset)
    }

    async fn fetch(&self, meta: &IndicatorMetadata) -> anyhow::Result<Dataset> {
        let params = meta.source_params();
        info!("Orchestrator: Processing '{}' (Source: {}, {})", meta.name, meta.source.label(), params);

        let (source, throttle): (Box<dyn DataSource>, &str) = match &meta.source {
            SourceType::Bcra { .. } => (Box::new(BcraFetcher::new(&self.config)), "BCRA"),
            SourceType::Table(spec) => {
                let table = TableFetcher::new(&self.config, spec.clone());
                let throttle = if fetcher::is_remote(&table.location()) { "TABLE" } else { "LOCAL" };
                (Box::new(table), throttle)
            }
        };

        RateLimiter::wait(throttle).await;

        let dataset = source
            .fetch_data(&params)
            .await
            .map_err(|e| anyhow::anyhow!("Fetch failed for {} ({}): {}", meta.slug, params, e))?;

        info!("  > Loaded {} rows for '{}' via {}", dataset.len(), meta.slug, source.name());
        Ok(dataset)
    }

    /// Loads the listings of one property type, once per session.
    pub async fn load_listings(&self, property: PropertyType) -> Result<Arc<Vec<Listing>>> {
        let key = CacheKey::new("listings", property.file_name());
        let loaded = self
            .listings
            .get_or_load(key, || self.fetch_listings(property))
            .await?;
        Ok(loaded)
    }

    async fn fetch_listings(&self, property: PropertyType) -> anyhow::Result<Vec<Listing>> {
        let location = self.config.data_location(property.file_name());
        info!("Loading {} listings from {}", property.label(), location);

        let throttle = if fetcher::is_remote(&location) { "TABLE" } else { "LOCAL" };
        RateLimiter::wait(throttle).await;

        let text = fetcher::read_text(&self.client, &location).await?;
        listings::parse_listings(&text)
    }
}

/// Reads a forecast test file from disk.
pub async fn load_forecast(path: &Path, actual_column: &str, scaled_models: &[&str]) -> Result<ForecastFrame> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(ForecastFrame::from_csv(&text, actual_column, scaled_models)?)
}
