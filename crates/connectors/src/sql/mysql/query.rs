use crate::sql::error::DbError;
use std::fmt;

const QUERY_SELECT_PAGE_SQL: &str = include_str!("sql/select_page.sql");
const QUERY_SELECT_OLDER_SQL: &str = include_str!("sql/select_older.sql");
const QUERY_CREATE_TABLE_SQL: &str = include_str!("sql/create_table.sql");
const QUERY_INSERT_USER_SQL: &str = include_str!("sql/insert_user.sql");
const QUERY_UPDATE_EMAIL_SQL: &str = include_str!("sql/update_email.sql");

pub const DEFAULT_TABLE: &str = "user_data";

/// MySQL's identifier length limit.
const MAX_IDENTIFIER_LEN: usize = 64;

/// A validated, unquoted MySQL identifier (table or database name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(name: &str) -> Result<Self, DbError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_IDENTIFIER_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

        if valid {
            Ok(Identifier(name.to_string()))
        } else {
            Err(DbError::InvalidIdentifier(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form for interpolation into SQL text.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn render(template: &str, table: &Identifier) -> String {
    template.trim().replace("{table}", &table.quoted())
}

pub fn select_page(table: &Identifier) -> String {
    render(QUERY_SELECT_PAGE_SQL, table)
}

pub fn select_older(table: &Identifier) -> String {
    render(QUERY_SELECT_OLDER_SQL, table)
}

pub fn create_table(table: &Identifier) -> String {
    render(QUERY_CREATE_TABLE_SQL, table)
}

pub fn insert_user(table: &Identifier) -> String {
    render(QUERY_INSERT_USER_SQL, table)
}

pub fn update_email(table: &Identifier) -> String {
    render(QUERY_UPDATE_EMAIL_SQL, table)
}

pub fn create_database(database: &Identifier) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database.quoted())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_identifiers_that_could_inject_sql() {
        assert!(Identifier::parse("user_data").is_ok());
        assert!(Identifier::parse("").is_err());
        assert!(Identifier::parse("users; DROP TABLE x").is_err());
        assert!(Identifier::parse("a`b").is_err());
        assert!(Identifier::parse(&"x".repeat(65)).is_err());
    }

    #[test]
    fn select_is_bounded_and_ordered_by_primary_key() {
        let table = Identifier::parse(DEFAULT_TABLE).unwrap();
        let sql = select_page(&table);

        assert!(sql.contains("FROM `user_data`"));
        assert!(sql.contains("ORDER BY user_id"));
        assert!(sql.ends_with("LIMIT ? OFFSET ?"));
    }

    #[test]
    fn age_threshold_is_a_bound_parameter() {
        let table = Identifier::parse(DEFAULT_TABLE).unwrap();
        let sql = select_older(&table);

        assert!(sql.contains("WHERE age > ?"));
        assert!(sql.ends_with("ORDER BY user_id"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn inserts_skip_existing_ids() {
        let table = Identifier::parse("people").unwrap();
        assert!(insert_user(&table).starts_with("INSERT IGNORE INTO `people`"));
    }
}
