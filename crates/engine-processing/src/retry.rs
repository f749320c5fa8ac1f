use connectors::{
    error::AdapterError,
    file::csv::error::FileError,
    source::PageFetcher,
    sql::error::{ConnectorError, DbError},
};
use async_trait::async_trait;
use engine_core::{
    metrics::Metrics,
    retry::{RetryDisposition, RetryError, RetryPolicy},
};
use futures::FutureExt;
use model::{pagination::page_size::PageSize, records::page::Page};
use mysql_async::Error as MySqlError;

pub fn classify_adapter_error(err: &AdapterError) -> RetryDisposition {
    match err {
        AdapterError::Database(db_err) => classify_db_error(db_err),
        AdapterError::Connector(conn_err) => classify_connector_error(conn_err),
        AdapterError::FileError(file_err) => classify_file_error(file_err),
        AdapterError::UnsupportedSource(_) => RetryDisposition::Stop,
    }
}

pub fn classify_db_error(err: &DbError) -> RetryDisposition {
    match err {
        DbError::Io(_) => RetryDisposition::Retry,
        DbError::MySql(mysql_err) => classify_mysql_error(mysql_err),
        DbError::Connector(conn_err) => classify_connector_error(conn_err),
        DbError::File(file_err) => classify_file_error(file_err),
        DbError::MissingColumn(_) => RetryDisposition::Stop,
        DbError::Decode { .. } => RetryDisposition::Stop,
        DbError::InvalidIdentifier(_) => RetryDisposition::Stop,
        DbError::MissingDatabase => RetryDisposition::Stop,
        DbError::Unknown(_) => RetryDisposition::Stop,
    }
}

pub fn classify_file_error(err: &FileError) -> RetryDisposition {
    match err {
        FileError::IoError(_) => RetryDisposition::Retry,
        FileError::CsvError(csv_err) if csv_err.is_io_error() => RetryDisposition::Retry,
        FileError::CsvError(_) => RetryDisposition::Stop,
        FileError::InvalidRecord { .. } => RetryDisposition::Stop,
    }
}

fn classify_connector_error(err: &ConnectorError) -> RetryDisposition {
    match err {
        ConnectorError::MySql(mysql_err) => classify_mysql_error(mysql_err),
        ConnectorError::InvalidUrl(_) => RetryDisposition::Stop,
    }
}

fn classify_mysql_error(err: &MySqlError) -> RetryDisposition {
    match err {
        MySqlError::Io(_) | MySqlError::Other(_) => RetryDisposition::Retry,
        MySqlError::Driver(_) => RetryDisposition::Retry,
        MySqlError::Server(server_err) => {
            if is_retryable_mysql_server_error(server_err.code, server_err.state.as_str()) {
                RetryDisposition::Retry
            } else {
                RetryDisposition::Stop
            }
        }
        _ => RetryDisposition::Stop,
    }
}

fn is_retryable_mysql_server_error(code: u16, state: &str) -> bool {
    // Common MySQL server error codes that are typically transient/retryable.
    // See: https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html
    const RETRYABLE_CODES: [u16; 8] = [1205, 1213, 2002, 2003, 2006, 2013, 1040, 1042];
    if RETRYABLE_CODES.contains(&code) {
        return true;
    }

    matches!(state, "40001" | "HYT00" | "08S01")
}

/// Error classifier usable with a given fetcher's error type.
pub type Classifier<E> = fn(&E) -> RetryDisposition;

/// Wraps a fetcher so each individual fetch is retried under a policy.
///
/// The wrapped fetcher is reused between attempts, so a stream built on top
/// still sees one fetch per page. Every attempt after the first reconnects
/// the wrapped fetcher before fetching.
pub struct RetryingFetcher<F: PageFetcher> {
    inner: F,
    policy: RetryPolicy,
    classify: Classifier<F::Error>,
    metrics: Option<Metrics>,
}

impl<F: PageFetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy, classify: Classifier<F::Error>) -> Self {
        Self {
            inner,
            policy,
            classify,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for RetryingFetcher<F> {
    type Error = RetryError<F::Error>;

    async fn fetch(&mut self, page_size: PageSize, offset: usize) -> Result<Page, Self::Error> {
        let mut attempts = 0u64;

        let result = self
            .policy
            .run_with(
                &mut self.inner,
                |inner| {
                    attempts += 1;
                    let reconnect = attempts > 1;
                    async move {
                        if reconnect {
                            inner.reconnect().await?;
                        }
                        inner.fetch(page_size, offset).await
                    }
                    .boxed()
                },
                self.classify,
            )
            .await;

        if attempts > 1 {
            if let Some(metrics) = &self.metrics {
                metrics.increment_retries(attempts - 1);
            }
        }

        result
    }
}
