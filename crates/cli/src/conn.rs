use crate::error::CliError;
use async_trait::async_trait;
use connectors::{
    adapter::SourceKind, error::AdapterError, file::csv::source::CsvPageFetcher,
    source::PageFetcher, sql::mysql::adapter::MySqlAdapter,
};
use model::pagination::page_size::PageSize;
use tracing::{error, info};

/// Trait for "pinging" a data source
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

/// MySQL/MariaDB pinger
pub struct MySqlConnectionPinger {
    pub conn_str: String,
}

/// Checks that a CSV file opens and its first row parses.
pub struct CsvConnectionPinger {
    pub path: String,
}

pub fn pinger_for(kind: SourceKind, location: String) -> Box<dyn ConnectionPinger + Send + Sync> {
    match kind {
        SourceKind::MySql => Box::new(MySqlConnectionPinger { conn_str: location }),
        SourceKind::Csv => Box::new(CsvConnectionPinger { path: location }),
    }
}

#[async_trait]
impl ConnectionPinger for MySqlConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        let adapter = MySqlAdapter::connect(&self.conn_str).map_err(|e| {
            error!("MySQL connection string parse failed: {}", e);
            AdapterError::Connector(e)
        })?;
        info!(
            "Pinging MySQL at {}:{}",
            adapter.opts().ip_or_hostname(),
            adapter.opts().tcp_port()
        );

        let result = adapter.ping().await;
        adapter.disconnect().await.ok();

        result.map_err(|e| {
            error!("MySQL ping failed: {}", e);
            CliError::Database(e)
        })?;

        info!("MySQL ping succeeded");
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for CsvConnectionPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!("Checking CSV file '{}'", &self.path);

        let mut fetcher = CsvPageFetcher::open(&self.path).map_err(|e| {
            error!("Opening '{}' failed: {}", &self.path, e);
            AdapterError::FileError(e)
        })?;
        let page_size = PageSize::new(1).map_err(|e| CliError::Unexpected(e.to_string()))?;
        let page = fetcher
            .fetch(page_size, 0)
            .await
            .map_err(AdapterError::FileError)?;

        info!(
            "CSV file '{}' is readable ({} row in first page)",
            &self.path,
            page.len()
        );
        Ok(())
    }
}
