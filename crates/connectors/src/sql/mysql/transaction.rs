use crate::sql::error::DbError;
use mysql_async::{Conn, TxOpts, prelude::Queryable};
use mysql_common::params::Params;
use tracing::{info, warn};

/// A parameterized statement queued for execution.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: impl Into<Params>) -> Self {
        Self {
            sql: sql.into(),
            params: params.into(),
        }
    }
}

/// Runs all statements in a single transaction.
///
/// Commits when every statement succeeds and returns the total number of
/// affected rows. On the first failure the transaction is rolled back and
/// that failure is returned.
pub async fn execute_in_transaction(
    conn: &mut Conn,
    statements: Vec<Statement>,
) -> Result<u64, DbError> {
    let mut tx = conn.start_transaction(TxOpts::default()).await?;
    let mut affected = 0u64;

    for statement in statements {
        info!("Executing SQL Query: {}", statement.sql);

        if let Err(err) = tx.exec_drop(statement.sql.as_str(), statement.params).await {
            warn!("Statement failed, rolling back transaction: {}", err);
            tx.rollback().await?;
            return Err(err.into());
        }
        affected += tx.affected_rows();
    }

    tx.commit().await?;
    Ok(affected)
}
