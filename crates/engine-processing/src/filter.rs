use bigdecimal::BigDecimal;
use engine_core::metrics::Metrics;
use futures::{Stream, TryStreamExt, future, stream};
use model::records::{page::Page, user::UserRecord};

/// Yields the records of a page stream that satisfy a predicate.
///
/// Order is preserved within and across pages and nothing beyond the current
/// page is buffered. Errors from the page stream pass through unchanged.
pub struct RecordFilter<P> {
    predicate: P,
    metrics: Option<Metrics>,
}

impl<P> RecordFilter<P>
where
    P: Fn(&UserRecord) -> bool + Send,
{
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn apply<S, E>(self, pages: S) -> impl Stream<Item = Result<UserRecord, E>> + Send
    where
        S: Stream<Item = Result<Page, E>> + Send,
        E: Send,
    {
        let RecordFilter { predicate, metrics } = self;

        pages
            .map_ok(|page| stream::iter(page.into_records().into_iter().map(Ok::<_, E>)))
            .try_flatten()
            .try_filter(move |record| {
                let keep = predicate(record);
                if keep {
                    if let Some(metrics) = &metrics {
                        metrics.increment_records_emitted(1);
                    }
                }
                future::ready(keep)
            })
    }
}

/// Every record of every page, one at a time.
pub fn stream_records<S, E>(pages: S) -> impl Stream<Item = Result<UserRecord, E>> + Send
where
    S: Stream<Item = Result<Page, E>> + Send,
    E: Send,
{
    RecordFilter::new(accept_all).apply(pages)
}

/// Records matching `predicate`, in source order.
pub fn filter_records<S, E, P>(
    pages: S,
    predicate: P,
) -> impl Stream<Item = Result<UserRecord, E>> + Send
where
    S: Stream<Item = Result<Page, E>> + Send,
    E: Send,
    P: Fn(&UserRecord) -> bool + Send,
{
    RecordFilter::new(predicate).apply(pages)
}

pub fn accept_all(_: &UserRecord) -> bool {
    true
}

/// Users strictly older than `age`.
pub fn older_than(age: impl Into<BigDecimal>) -> impl Fn(&UserRecord) -> bool + Clone + Send {
    let threshold = age.into();
    move |record: &UserRecord| record.age > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::batch_stream;
    use connectors::{
        memory::{FailurePlan, MemoryPageFetcher},
        sql::error::DbError,
    };
    use futures::StreamExt;
    use model::pagination::page_size::PageSize;

    fn users(ages: &[i64]) -> Vec<UserRecord> {
        ages.iter()
            .enumerate()
            .map(|(i, age)| {
                UserRecord::new(
                    format!("user-{i:03}"),
                    format!("User {i}"),
                    format!("user{i}@example.com"),
                    *age,
                )
            })
            .collect()
    }

    fn size(n: usize) -> PageSize {
        PageSize::new(n).unwrap()
    }

    const AGES: [i64; 10] = [22, 67, 25, 26, 90, 18, 25, 41, 33, 19];

    #[tokio::test]
    async fn keeps_matching_records_in_source_order() {
        let source = users(&AGES);
        let expected: Vec<UserRecord> = source
            .iter()
            .filter(|u| u.age > BigDecimal::from(25))
            .cloned()
            .collect();

        for page_size in 1..=11 {
            let pages = batch_stream(MemoryPageFetcher::new(source.clone()), size(page_size));
            let older: Vec<UserRecord> = filter_records(pages, older_than(25))
                .try_collect()
                .await
                .unwrap();

            assert_eq!(older, expected, "page size {page_size}");
        }
    }

    #[tokio::test]
    async fn threshold_is_exclusive() {
        let pages = batch_stream(MemoryPageFetcher::new(users(&[25, 26])), size(5));
        let older: Vec<UserRecord> = filter_records(pages, older_than(25))
            .try_collect()
            .await
            .unwrap();

        assert_eq!(older.len(), 1);
        assert_eq!(older[0].age, BigDecimal::from(26));
    }

    #[tokio::test]
    async fn stream_records_flattens_all_pages() {
        let source = users(&AGES);
        let pages = batch_stream(MemoryPageFetcher::new(source.clone()), size(4));
        let all: Vec<UserRecord> = stream_records(pages).try_collect().await.unwrap();

        assert_eq!(all, source);
    }

    #[tokio::test]
    async fn pulls_pages_only_as_records_are_consumed() {
        let fetcher = MemoryPageFetcher::new(users(&AGES));
        let records = stream_records(batch_stream(fetcher.clone(), size(3)));
        futures::pin_mut!(records);

        // first three records come from the first page
        for _ in 0..3 {
            records.next().await.unwrap().unwrap();
        }
        assert_eq!(fetcher.requested_offsets(), vec![0]);

        records.next().await.unwrap().unwrap();
        assert_eq!(fetcher.requested_offsets(), vec![0, 3]);
    }

    #[tokio::test]
    async fn surfaces_fetch_errors_after_earlier_records() {
        let fetcher = MemoryPageFetcher::new(users(&AGES)).failing(FailurePlan {
            offset: 5,
            times: None,
        });
        let results: Vec<Result<UserRecord, DbError>> =
            stream_records(batch_stream(fetcher, size(5))).collect().await;

        assert_eq!(results.len(), 6);
        assert!(results[..5].iter().all(Result::is_ok));
        assert!(matches!(results[5], Err(DbError::Io(_))));
    }

    #[tokio::test]
    async fn counts_emitted_records() {
        let metrics = Metrics::new();
        let pages = batch_stream(MemoryPageFetcher::new(users(&AGES)), size(3));
        let older: Vec<UserRecord> = RecordFilter::new(older_than(25))
            .with_metrics(metrics.clone())
            .apply(pages)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(metrics.snapshot().records_emitted, older.len() as u64);
    }
}
