use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::trace;

use super::listing::ListingPage;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Storage for computed listing pages. Entries expire on their own; nothing
/// is invalidated on write.
#[async_trait]
pub trait ListingCache: Send + Sync {
    async fn get_page(&self, key: &str) -> CacheResult<Option<ListingPage>>;
    async fn set_page(&self, key: &str, page: &ListingPage) -> CacheResult<()>;
}

/// In-process listing cache backed by Moka, bounded by entry count and
/// expiring every entry a fixed time after insertion.
#[derive(Debug, Clone)]
pub struct MokaListingCache {
    cache: Cache<String, ListingPage>,
}

impl MokaListingCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl ListingCache for MokaListingCache {
    async fn get_page(&self, key: &str) -> CacheResult<Option<ListingPage>> {
        let page = self.cache.get(key).await;
        trace!(key, hit = page.is_some(), "listing cache lookup");
        Ok(page)
    }

    async fn set_page(&self, key: &str, page: &ListingPage) -> CacheResult<()> {
        self.cache.insert(key.to_string(), page.clone()).await;
        trace!(key, "listing cache store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(next: Option<&str>) -> ListingPage {
        ListingPage {
            next_page: next.map(str::to_string),
            results: Vec::new(),
        }
    }

    #[tokio::test]
    async fn cache_get_and_set() {
        let cache = MokaListingCache::new(100, Duration::from_secs(300));

        assert!(cache.get_page("movies:1::1").await.unwrap().is_none());

        cache
            .set_page("movies:1::1", &page(Some("/movies/?page=2")))
            .await
            .unwrap();

        let cached = cache.get_page("movies:1::1").await.unwrap();
        assert_eq!(cached, Some(page(Some("/movies/?page=2"))));
        assert!(cache.get_page("movies:2::1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_entries_expire() {
        let cache = MokaListingCache::new(100, Duration::from_millis(50));

        cache.set_page("planets:::1", &page(None)).await.unwrap();
        assert!(cache.get_page("planets:::1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get_page("planets:::1").await.unwrap().is_none());
    }
}
