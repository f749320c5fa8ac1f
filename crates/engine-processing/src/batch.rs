use connectors::source::PageFetcher;
use engine_core::metrics::Metrics;
use futures::{Stream, stream};
use model::{
    pagination::{cursor::OffsetCursor, page_size::PageSize},
    records::page::Page,
};
use tracing::{debug, warn};

/// Lazily pulls successive pages out of a [`PageFetcher`].
///
/// The resulting stream fetches only when polled, so a consumer that stops
/// early never triggers another query. It owns the fetcher: whether the
/// stream is exhausted, fails or is dropped half-way, the fetcher (and any
/// connection it holds) is dropped with it.
pub struct BatchStream<F> {
    fetcher: F,
    page_size: PageSize,
    metrics: Option<Metrics>,
}

impl<F> BatchStream<F>
where
    F: PageFetcher,
{
    pub fn new(fetcher: F, page_size: PageSize) -> Self {
        Self {
            fetcher,
            page_size,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Starts a fresh cursor at offset 0.
    ///
    /// Yields non-empty pages in source order and ends at the first empty
    /// page. A fetch error is yielded once and ends the stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page, F::Error>> + Send {
        let state = (self.fetcher, OffsetCursor::start(self.page_size), self.metrics);

        stream::try_unfold(state, |(mut fetcher, cursor, metrics)| async move {
            let page = match fetcher.fetch(cursor.page_size(), cursor.offset()).await {
                Ok(page) => page,
                Err(err) => {
                    warn!("Fetch at offset {} failed: {}", cursor.offset(), err);
                    if let Some(metrics) = &metrics {
                        metrics.increment_failures(1);
                    }
                    return Err(err);
                }
            };

            if page.is_empty() {
                debug!("Source exhausted at offset {}", cursor.offset());
                return Ok(None);
            }

            debug!(
                "Fetched page at offset {} with {} records in {}ms",
                page.offset,
                page.len(),
                page.took_ms
            );
            if let Some(metrics) = &metrics {
                metrics.increment_pages(1);
                metrics.increment_records_read(page.len() as u64);
            }

            Ok(Some((page, (fetcher, cursor.advance(), metrics))))
        })
    }
}

/// Shorthand for `BatchStream::new(fetcher, page_size).into_stream()`.
pub fn batch_stream<F>(
    fetcher: F,
    page_size: PageSize,
) -> impl Stream<Item = Result<Page, F::Error>> + Send
where
    F: PageFetcher,
{
    BatchStream::new(fetcher, page_size).into_stream()
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::{
        memory::{FailurePlan, MemoryPageFetcher},
        sql::error::DbError,
    };
    use futures::{StreamExt, TryStreamExt};
    use model::records::user::UserRecord;

    fn users(count: usize) -> Vec<UserRecord> {
        (0..count)
            .map(|i| {
                UserRecord::new(
                    format!("user-{i:03}"),
                    format!("User {i}"),
                    format!("user{i}@example.com"),
                    18 + (i as i64 * 7) % 60,
                )
            })
            .collect()
    }

    fn size(n: usize) -> PageSize {
        PageSize::new(n).unwrap()
    }

    #[tokio::test]
    async fn ten_records_in_pages_of_three() {
        let fetcher = MemoryPageFetcher::new(users(10));
        let pages: Vec<Page> = batch_stream(fetcher.clone(), size(3))
            .try_collect()
            .await
            .unwrap();

        let sizes: Vec<usize> = pages.iter().map(Page::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);
        assert_eq!(fetcher.requested_offsets(), vec![0, 3, 6, 9, 12]);
    }

    #[tokio::test]
    async fn concatenated_pages_reproduce_the_source() {
        let source = users(23);

        for page_size in 1..=25 {
            let fetcher = MemoryPageFetcher::new(source.clone());
            let records: Vec<UserRecord> = batch_stream(fetcher.clone(), size(page_size))
                .map_ok(Page::into_records)
                .try_concat()
                .await
                .unwrap();

            assert_eq!(records, source, "page size {page_size}");

            let offsets = fetcher.requested_offsets();
            assert!(
                offsets.windows(2).all(|w| w[1] == w[0] + page_size),
                "offsets must step by exactly {page_size}: {offsets:?}"
            );
        }
    }

    #[tokio::test]
    async fn page_size_larger_than_source_yields_one_page() {
        let fetcher = MemoryPageFetcher::new(users(4));
        let pages: Vec<Page> = batch_stream(fetcher.clone(), size(10))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].len(), 4);
        // one confirming fetch past the end, never surfaced as a page
        assert_eq!(fetcher.requested_offsets(), vec![0, 10]);
    }

    #[tokio::test]
    async fn empty_source_yields_nothing() {
        let fetcher = MemoryPageFetcher::new(Vec::new());
        let pages: Vec<Page> = batch_stream(fetcher.clone(), size(5))
            .try_collect()
            .await
            .unwrap();

        assert!(pages.is_empty());
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn stopping_early_does_not_prefetch() {
        let fetcher = MemoryPageFetcher::new(users(30));
        let stream = batch_stream(fetcher.clone(), size(4));
        futures::pin_mut!(stream);

        for _ in 0..2 {
            stream.next().await.unwrap().unwrap();
        }
        assert_eq!(fetcher.requested_offsets(), vec![0, 4]);

        drop(stream);
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failure_ends_the_stream_after_surfacing() {
        let fetcher = MemoryPageFetcher::new(users(10)).failing(FailurePlan {
            offset: 6,
            times: None,
        });
        let stream = batch_stream(fetcher.clone(), size(3));
        futures::pin_mut!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap().len(), 3);
        assert_eq!(stream.next().await.unwrap().unwrap().len(), 3);
        assert!(matches!(stream.next().await, Some(Err(DbError::Io(_)))));
        assert!(stream.next().await.is_none());
        assert_eq!(fetcher.requested_offsets(), vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn records_metrics_per_page() {
        let metrics = Metrics::new();
        let fetcher = MemoryPageFetcher::new(users(7));
        let pages: Vec<Page> = BatchStream::new(fetcher, size(3))
            .with_metrics(metrics.clone())
            .into_stream()
            .try_collect()
            .await
            .unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(pages.len(), 3);
        assert_eq!(snapshot.pages_fetched, 3);
        assert_eq!(snapshot.records_read, 7);
        assert_eq!(snapshot.failure_count, 0);
    }
}
