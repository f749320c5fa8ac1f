use async_trait::async_trait;
use model::{pagination::page_size::PageSize, records::page::Page};

/// Fetches one bounded page of records from a source.
///
/// Each call issues exactly one query equivalent to
/// `LIMIT page_size OFFSET offset` over a stable ordering. An empty page means
/// the source is exhausted at `offset`. Implementations never retry; callers
/// compose retries on top and call [`PageFetcher::reconnect`] before each
/// new attempt.
#[async_trait]
pub trait PageFetcher: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch(&mut self, page_size: PageSize, offset: usize) -> Result<Page, Self::Error>;

    /// Replaces whatever handle the fetcher reads through after a failed fetch.
    async fn reconnect(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

