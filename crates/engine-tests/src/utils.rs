use connectors::sql::mysql::{
    adapter::MySqlAdapter,
    query::Identifier,
    seed::{SeedReport, seed_from_csv},
    transaction::{Statement, execute_in_transaction},
};
use model::records::user::UserRecord;
use mysql_async::prelude::Queryable;
use std::io::Write;
use tempfile::NamedTempFile;

/// `count` users with zero-padded ids, so that id order equals insertion
/// order. Ages cycle from 18 to 77.
pub fn sample_users(count: usize) -> Vec<UserRecord> {
    (0..count)
        .map(|i| {
            UserRecord::new(
                format!("00000000-0000-4000-8000-{i:012}"),
                format!("User {i}"),
                format!("user{i}@example.com"),
                18 + (i % 60) as u32,
            )
        })
        .collect()
}

/// Writes users to a CSV file in the seeding layout.
pub fn users_csv(users: &[UserRecord]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create csv");
    writeln!(file, "user_id,name,email,age").expect("write header");
    for user in users {
        writeln!(
            file,
            "{},{},{},{}",
            user.user_id, user.name, user.email, user.age
        )
        .expect("write row");
    }
    file
}

/// Drops `table` and reloads it with `users`.
pub async fn reseed(adapter: &MySqlAdapter, table: &str, users: &[UserRecord]) -> SeedReport {
    drop_table(adapter, table).await;
    let csv = users_csv(users);
    seed_from_csv(adapter, table, csv.path())
        .await
        .expect("seed table")
}

pub async fn drop_table(adapter: &MySqlAdapter, table: &str) {
    // The database itself may not exist yet on a fresh server.
    connectors::sql::mysql::seed::create_database(adapter)
        .await
        .expect("create database");

    let table = Identifier::parse(table).expect("table name");
    let mut session = adapter.session().await.expect("open session");
    session
        .conn()
        .query_drop(format!("DROP TABLE IF EXISTS {}", table.quoted()))
        .await
        .expect("drop table");
}

pub async fn email_of(adapter: &MySqlAdapter, table: &str, user_id: &str) -> Option<String> {
    let table = Identifier::parse(table).expect("table name");
    let mut session = adapter.session().await.expect("open session");
    session
        .conn()
        .exec_first(
            format!("SELECT email FROM {} WHERE user_id = ?", table.quoted()),
            (user_id,),
        )
        .await
        .expect("select email")
}

pub async fn row_count(adapter: &MySqlAdapter, table: &str) -> u64 {
    let table = Identifier::parse(table).expect("table name");
    let mut session = adapter.session().await.expect("open session");
    session
        .conn()
        .query_first(format!("SELECT COUNT(*) FROM {}", table.quoted()))
        .await
        .expect("count rows")
        .unwrap_or_default()
}

/// Runs statements in one transaction on a fresh session.
pub async fn run_transaction(
    adapter: &MySqlAdapter,
    statements: Vec<Statement>,
) -> Result<u64, connectors::sql::error::DbError> {
    let mut session = adapter.session().await.expect("open session");
    execute_in_transaction(session.conn(), statements).await
}
