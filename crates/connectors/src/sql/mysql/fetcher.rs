use crate::{
    source::PageFetcher,
    sql::{
        error::DbError,
        mysql::{query, query::Identifier, row::to_user_record, session::MySqlSession},
    },
};
use async_trait::async_trait;
use model::{pagination::page_size::PageSize, records::page::Page};
use mysql_async::{Pool, Row, prelude::Queryable};
use std::time::Instant;
use tracing::{debug, warn};

/// Pages through a `user_data` table over one dedicated connection.
///
/// The connection is held from creation until the fetcher is dropped, so a
/// stream that owns the fetcher releases it on every exit path. After a
/// failure, [`PageFetcher::reconnect`] swaps in a fresh connection from the
/// pool.
pub struct MySqlPageFetcher {
    pool: Pool,
    session: MySqlSession,
    table: Identifier,
    sql: String,
}

impl MySqlPageFetcher {
    pub fn new(pool: Pool, session: MySqlSession, table: Identifier) -> Self {
        let sql = query::select_page(&table);
        Self {
            pool,
            session,
            table,
            sql,
        }
    }
}

#[async_trait]
impl PageFetcher for MySqlPageFetcher {
    type Error = DbError;

    async fn fetch(&mut self, page_size: PageSize, offset: usize) -> Result<Page, DbError> {
        let start = Instant::now();
        debug!(
            "Executing SQL Query: {} [limit={}, offset={}]",
            self.sql, page_size, offset
        );

        let rows: Vec<Row> = self
            .session
            .conn()
            .exec(self.sql.as_str(), (page_size.get() as u64, offset as u64))
            .await?;

        let records = rows
            .into_iter()
            .map(to_user_record)
            .collect::<Result<Vec<_>, _>>()?;

        let took_ms = start.elapsed().as_millis();
        debug!(
            "Fetched {} rows from {} at offset {} in {}ms",
            records.len(),
            self.table,
            offset,
            took_ms
        );

        Ok(Page::new(offset, records, took_ms))
    }

    async fn reconnect(&mut self) -> Result<(), DbError> {
        let conn = self.pool.get_conn().await?;
        // The old connection goes back to the pool, which discards it if broken.
        let old = std::mem::replace(&mut self.session, MySqlSession::new(conn));
        warn!(
            "Replaced MySQL connection {} with {} for table {}",
            old.id(),
            self.session.id(),
            self.table
        );
        Ok(())
    }
}
