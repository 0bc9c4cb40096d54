use crate::models::Dataset;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Identifies one load: which source, with which parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: String,
    pub params: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, params: impl Into<String>) -> Self {
        Self { source: source.into(), params: params.into() }
    }
}

/// Process-lifetime memo of loaded data, datasets by default.
///
/// Entries are immutable once stored; callers share them through `Arc`.
/// Nothing expires on its own, use [`DatasetCache::invalidate`] or
/// [`DatasetCache::clear`] to force a reload.
pub struct DatasetCache<T = Dataset> {
    entries: RwLock<HashMap<CacheKey, Arc<T>>>,
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

impl<T> DatasetCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<T>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Returns the cached value for `key`, running `load` only on a miss.
    /// A failed load caches nothing.
    pub async fn get_or_load<F, Fut>(&self, key: CacheKey, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(&key).await {
            debug!("Cache hit: {}/{}", key.source, key.params);
            return Ok(hit);
        }

        debug!("Cache miss: {}/{}", key.source, key.params);
        let value = Arc::new(load().await?);

        // If another task filled the slot meanwhile, keep the first entry.
        let mut entries = self.entries.write().await;
        let stored = entries.entry(key).or_insert(value);
        Ok(stored.clone())
    }

    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataPoint;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> Dataset {
        Dataset::from_points(
            "v",
            vec![DataPoint::new(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(), 1.0)],
        )
    }

    #[tokio::test]
    async fn test_repeated_key_loads_once() {
        let cache = DatasetCache::new();
        let calls = AtomicUsize::new(0);
        let key = CacheKey::new("bcra", "1");

        for _ in 0..3 {
            let ds = cache
                .get_or_load(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample())
                })
                .await
                .unwrap();
            assert_eq!(ds.len(), 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: DatasetCache = DatasetCache::new();
        let key = CacheKey::new("bcra", "15");

        let err = cache
            .get_or_load(key.clone(), || async { Err(anyhow::anyhow!("boom")) })
            .await;
        assert!(err.is_err());
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache = DatasetCache::new();
        let key = CacheKey::new("table", "inflacion");
        cache.get_or_load(key.clone(), || async { Ok(sample()) }).await.unwrap();

        assert!(cache.invalidate(&key).await);
        assert!(!cache.invalidate(&key).await);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_drops_every_entry() {
        let cache = DatasetCache::new();
        for id in ["1", "15"] {
            cache.get_or_load(CacheKey::new("bcra", id), || async { Ok(sample()) }).await.unwrap();
        }
        assert_eq!(cache.len().await, 2);

        cache.clear().await;
        assert_eq!(cache.len().await, 0);
        assert!(cache.get(&CacheKey::new("bcra", "1")).await.is_none());
    }

    #[tokio::test]
    async fn test_holds_non_dataset_values() {
        let cache: DatasetCache<Vec<u32>> = DatasetCache::new();
        let key = CacheKey::new("listings", "casas.csv");
        let first = cache.get_or_load(key.clone(), || async { Ok(vec![1, 2]) }).await.unwrap();
        let second = cache.get_or_load(key, || async { Ok(vec![9]) }).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
