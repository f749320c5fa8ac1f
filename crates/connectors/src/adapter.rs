use crate::{
    error::AdapterError,
    file::csv::source::CsvPageFetcher,
    source::PageFetcher,
    sql::mysql::{adapter::MySqlAdapter, fetcher::MySqlPageFetcher},
};
use async_trait::async_trait;
use model::{pagination::page_size::PageSize, records::page::Page};
use std::{path::PathBuf, str::FromStr};

/// Kind of record source a run reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    MySql,
    Csv,
}

impl FromStr for SourceKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SourceKind::MySql),
            "csv" => Ok(SourceKind::Csv),
            other => Err(AdapterError::UnsupportedSource(other.to_string())),
        }
    }
}

#[derive(Clone)]
pub enum Adapter {
    MySql(MySqlAdapter),
    Csv(PathBuf),
}

impl Adapter {
    /// `location` is a connection URL for MySQL or a file path for CSV.
    pub fn new(kind: SourceKind, location: &str) -> Result<Self, AdapterError> {
        match kind {
            SourceKind::MySql => Ok(Adapter::MySql(MySqlAdapter::connect(location)?)),
            SourceKind::Csv => Ok(Adapter::Csv(PathBuf::from(location))),
        }
    }

    /// Opens a fresh fetcher. Each stream invocation gets its own, and with
    /// it its own connection or file handle.
    pub async fn open_fetcher(&self, table: &str) -> Result<SourceFetcher, AdapterError> {
        match self {
            Adapter::MySql(adapter) => Ok(SourceFetcher::MySql(adapter.open_fetcher(table).await?)),
            Adapter::Csv(path) => Ok(SourceFetcher::Csv(CsvPageFetcher::open(path)?)),
        }
    }

    pub fn as_mysql(&self) -> Option<&MySqlAdapter> {
        match self {
            Adapter::MySql(adapter) => Some(adapter),
            Adapter::Csv(_) => None,
        }
    }

    pub async fn close(self) -> Result<(), AdapterError> {
        match self {
            Adapter::MySql(adapter) => Ok(adapter.disconnect().await?),
            Adapter::Csv(_) => Ok(()),
        }
    }
}

/// Any of the supported page fetchers behind one error type.
pub enum SourceFetcher {
    MySql(MySqlPageFetcher),
    Csv(CsvPageFetcher),
}

#[async_trait]
impl PageFetcher for SourceFetcher {
    type Error = AdapterError;

    async fn fetch(&mut self, page_size: PageSize, offset: usize) -> Result<Page, AdapterError> {
        match self {
            SourceFetcher::MySql(fetcher) => Ok(fetcher.fetch(page_size, offset).await?),
            SourceFetcher::Csv(fetcher) => Ok(fetcher.fetch(page_size, offset).await?),
        }
    }

    async fn reconnect(&mut self) -> Result<(), AdapterError> {
        match self {
            SourceFetcher::MySql(fetcher) => Ok(fetcher.reconnect().await?),
            SourceFetcher::Csv(fetcher) => Ok(fetcher.reconnect().await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_source_kinds() {
        assert_eq!("MySQL".parse::<SourceKind>().unwrap(), SourceKind::MySql);
        assert_eq!("csv".parse::<SourceKind>().unwrap(), SourceKind::Csv);
        assert!(matches!(
            "ftp".parse::<SourceKind>(),
            Err(AdapterError::UnsupportedSource(_))
        ));
    }

    #[test]
    fn rejects_malformed_mysql_url() {
        assert!(matches!(
            Adapter::new(SourceKind::MySql, "not a url"),
            Err(AdapterError::Connector(_))
        ));
    }
}
