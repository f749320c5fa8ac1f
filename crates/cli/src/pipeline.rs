use crate::{commands::SourceArgs, env::EnvManager, error::CliError};
use bigdecimal::BigDecimal;
use connectors::adapter::{Adapter, SourceKind};
use engine_core::{metrics::Metrics, retry::RetryPolicy};
use engine_processing::{
    batch::BatchStream,
    cache::{CachedFetcher, SharedPageCache},
    error::StreamError,
    filter::{RecordFilter, older_than, stream_records},
    retry::{RetryingFetcher, classify_adapter_error},
};
use futures_util::{Stream, StreamExt, TryStreamExt, future::Either};
use model::{
    pagination::page_size::PageSize,
    records::{page::Page, user::UserRecord},
};
use std::{num::NonZeroUsize, str::FromStr, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::info;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Everything needed to open page streams over one source.
///
/// Every call to [`Pipeline::pages`] opens a new fetcher (and connection) and
/// starts at offset 0. The page cache, when enabled, is shared between calls.
pub struct Pipeline {
    adapter: Adapter,
    table: String,
    page_size: PageSize,
    retry: RetryPolicy,
    cache: Option<SharedPageCache>,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        args: &SourceArgs,
        env: &EnvManager,
        metrics: Metrics,
        cancel: CancellationToken,
    ) -> Result<Self, CliError> {
        let kind = SourceKind::from_str(&args.source)?;
        let location = env.database_url(args.url.as_deref())?;
        let adapter = Adapter::new(kind, &location)?;

        let retry = RetryPolicy::new(
            args.retries,
            Duration::from_millis(args.retry_delay_ms),
            MAX_RETRY_DELAY,
        );
        let cache = NonZeroUsize::new(args.cache_pages).map(SharedPageCache::new);

        info!(
            "Reading {:?} source, table {}, {} records per page",
            kind, args.table, args.page_size
        );

        Ok(Pipeline {
            adapter,
            table: args.table.clone(),
            page_size: args.page_size,
            retry,
            cache,
            metrics,
            cancel,
        })
    }

    /// Opens a fresh page stream. It ends at exhaustion, on the first error,
    /// or when the cancellation token fires.
    pub async fn pages(
        &self,
    ) -> Result<impl Stream<Item = Result<Page, StreamError>> + Send, CliError> {
        let fetcher = self.adapter.open_fetcher(&self.table).await?;
        let fetcher = RetryingFetcher::new(fetcher, self.retry.clone(), classify_adapter_error)
            .with_metrics(self.metrics.clone());

        let pages = match &self.cache {
            Some(cache) => {
                let fetcher = CachedFetcher::new(fetcher, cache.clone())
                    .with_metrics(self.metrics.clone());
                Either::Left(
                    BatchStream::new(fetcher, self.page_size)
                        .with_metrics(self.metrics.clone())
                        .into_stream(),
                )
            }
            None => Either::Right(
                BatchStream::new(fetcher, self.page_size)
                    .with_metrics(self.metrics.clone())
                    .into_stream(),
            ),
        };

        Ok(pages
            .map_err(StreamError::from)
            .take_until(self.cancel.clone().cancelled_owned()))
    }

    /// Reads every user and the users older than `min_age` at the same time,
    /// each over its own stream and connection. The first error cancels the
    /// other read.
    pub async fn all_and_older(
        &self,
        min_age: &BigDecimal,
    ) -> Result<(Vec<UserRecord>, Vec<UserRecord>), CliError> {
        let all = async {
            let records: Vec<UserRecord> =
                stream_records(self.pages().await?).try_collect().await?;
            Ok::<_, CliError>(records)
        };
        let older = async {
            let filter = RecordFilter::new(older_than(min_age.clone()))
                .with_metrics(self.metrics.clone());
            let records: Vec<UserRecord> =
                filter.apply(self.pages().await?).try_collect().await?;
            Ok::<_, CliError>(records)
        };

        tokio::try_join!(all, older)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn close(self) -> Result<(), CliError> {
        self.adapter.close().await?;
        Ok(())
    }
}
