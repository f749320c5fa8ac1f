use crate::sql::{
    error::{ConnectorError, DbError},
    mysql::{
        fetcher::MySqlPageFetcher,
        query::{self, Identifier},
        row::to_user_record,
        session::MySqlSession,
        transaction::{Statement, execute_in_transaction},
    },
};
use bigdecimal::BigDecimal;
use engine_core::scope::scoped;
use futures::FutureExt;
use model::records::user::UserRecord;
use mysql_async::{Opts, Pool, Row, prelude::Queryable};
use tracing::{error, info};

/// Entry point to a MySQL database: owns the connection pool.
#[derive(Clone)]
pub struct MySqlAdapter {
    pool: Pool,
    opts: Opts,
}

impl MySqlAdapter {
    /// Parses the URL and sets up a pool. No connection is made until a
    /// session is requested.
    pub fn connect(url: &str) -> Result<Self, ConnectorError> {
        let opts = Opts::from_url(url)?;
        let pool = Pool::new(opts.clone());
        Ok(MySqlAdapter { pool, opts })
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Database selected by the connection URL.
    pub fn database(&self) -> Option<&str> {
        self.opts.db_name()
    }

    /// Checks out one connection. Fails fast when the server is unreachable.
    pub async fn session(&self) -> Result<MySqlSession, ConnectorError> {
        let conn = self.pool.get_conn().await.map_err(|e| {
            error!(
                "MySQL connection to {}:{} failed: {}",
                self.opts.ip_or_hostname(),
                self.opts.tcp_port(),
                e
            );
            ConnectorError::MySql(e)
        })?;
        Ok(MySqlSession::new(conn))
    }

    /// Opens a page fetcher holding its own connection for its whole life.
    pub async fn open_fetcher(&self, table: &str) -> Result<MySqlPageFetcher, DbError> {
        let table = Identifier::parse(table)?;
        let session = self.session().await?;
        info!("Opened MySQL connection {} for table {}", session.id(), table);
        Ok(MySqlPageFetcher::new(self.pool.clone(), session, table))
    }

    /// Runs `SELECT 1` and checks the answer.
    pub async fn ping(&self) -> Result<(), DbError> {
        let session = self.session().await?;

        scoped(session, |session| {
            async move {
                let val: Option<i32> = session.conn().query_first("SELECT 1").await?;
                match val {
                    Some(1) => Ok(()),
                    other => Err(DbError::Unknown(format!(
                        "ping returned unexpected result: {other:?}"
                    ))),
                }
            }
            .boxed()
        })
        .await
    }

    /// Users strictly older than `age`, read in one bound-parameter query on
    /// a connection that is closed afterwards whatever the outcome.
    pub async fn users_older_than(
        &self,
        table: &str,
        age: &BigDecimal,
    ) -> Result<Vec<UserRecord>, DbError> {
        let table = Identifier::parse(table)?;
        let sql = query::select_older(&table);
        let age = age.to_string();
        let session = self.session().await?;

        scoped(session, |session| {
            async move {
                info!("Executing SQL Query: {} [age={}]", sql, age);
                let rows: Vec<Row> = session.conn().exec(sql.as_str(), (age,)).await?;
                rows.into_iter()
                    .map(to_user_record)
                    .collect::<Result<Vec<_>, DbError>>()
            }
            .boxed()
        })
        .await
    }

    /// Changes one user's email inside a transaction. Returns the number of
    /// rows touched.
    pub async fn update_email(
        &self,
        table: &str,
        user_id: &str,
        email: &str,
    ) -> Result<u64, DbError> {
        let table = Identifier::parse(table)?;
        let statement = Statement::new(
            query::update_email(&table),
            (email.to_string(), user_id.to_string()),
        );
        let session = self.session().await?;

        scoped(session, |session| {
            execute_in_transaction(session.conn(), vec![statement]).boxed()
        })
        .await
    }

    /// Waits for every pooled connection to be returned, then closes them.
    pub async fn disconnect(self) -> Result<(), DbError> {
        self.pool.disconnect().await?;
        Ok(())
    }
}
