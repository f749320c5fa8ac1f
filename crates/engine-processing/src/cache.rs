use async_trait::async_trait;
use connectors::source::PageFetcher;
use engine_core::{cache::LruCache, metrics::Metrics};
use model::{pagination::page_size::PageSize, records::page::Page};
use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub page_size: usize,
    pub offset: usize,
}

/// Page cache shared by every fetcher reading the same source.
#[derive(Debug, Clone)]
pub struct SharedPageCache {
    inner: Arc<Mutex<LruCache<PageKey, Page>>>,
}

impl SharedPageCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn get(&self, key: &PageKey) -> Option<Page> {
        self.lock().get(key)
    }

    pub fn put(&self, key: PageKey, page: Page) {
        if let Some((evicted, _)) = self.lock().put(key, page) {
            debug!("Evicted cached page at offset {}", evicted.offset);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<PageKey, Page>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Serves repeated page requests from a bounded cache.
///
/// Only non-empty pages are cached, so a source that grows is still noticed
/// at its end.
pub struct CachedFetcher<F> {
    inner: F,
    cache: SharedPageCache,
    metrics: Option<Metrics>,
}

impl<F: PageFetcher> CachedFetcher<F> {
    pub fn new(inner: F, cache: SharedPageCache) -> Self {
        Self {
            inner,
            cache,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for CachedFetcher<F> {
    type Error = F::Error;

    async fn fetch(&mut self, page_size: PageSize, offset: usize) -> Result<Page, F::Error> {
        let key = PageKey {
            page_size: page_size.get(),
            offset,
        };

        if let Some(page) = self.cache.get(&key) {
            debug!("Cache hit for page at offset {}", offset);
            if let Some(metrics) = &self.metrics {
                metrics.increment_cache_hits(1);
            }
            return Ok(page);
        }

        let page = self.inner.fetch(page_size, offset).await?;
        if !page.is_empty() {
            debug!("Caching page at offset {}", offset);
            self.cache.put(key, page.clone());
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{batch::batch_stream, filter::stream_records};
    use connectors::memory::MemoryPageFetcher;
    use futures::TryStreamExt;
    use model::records::user::UserRecord;

    fn users(count: usize) -> Vec<UserRecord> {
        (0..count)
            .map(|i| UserRecord::new(format!("u{i}"), "n", "e@example.com", 30))
            .collect()
    }

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn second_pass_is_served_from_cache() {
        let memory = MemoryPageFetcher::new(users(5));
        let cache = SharedPageCache::new(capacity(8));
        let metrics = Metrics::new();
        let size = PageSize::new(2).unwrap();

        for _ in 0..2 {
            let fetcher = CachedFetcher::new(memory.clone(), cache.clone())
                .with_metrics(metrics.clone());
            let records: Vec<UserRecord> = stream_records(batch_stream(fetcher, size))
                .try_collect()
                .await
                .unwrap();
            assert_eq!(records.len(), 5);
        }

        // the empty page at offset 6 is never cached
        assert_eq!(memory.requested_offsets(), vec![0, 2, 4, 6, 6]);
        assert_eq!(metrics.snapshot().cache_hits, 3);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn capacity_bounds_the_cache() {
        let memory = MemoryPageFetcher::new(users(10));
        let cache = SharedPageCache::new(capacity(2));
        let fetcher = CachedFetcher::new(memory.clone(), cache.clone());

        let pages: Vec<Page> = batch_stream(fetcher, PageSize::new(2).unwrap())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages.len(), 5);
        assert_eq!(cache.len(), 2);

        let newest = PageKey {
            page_size: 2,
            offset: 8,
        };
        let oldest = PageKey {
            page_size: 2,
            offset: 0,
        };
        assert!(cache.get(&newest).is_some());
        assert!(cache.get(&oldest).is_none());
    }
}
