use crate::file::csv::error::FileError;
use bigdecimal::BigDecimal;
use csv::StringRecord;
use model::records::user::UserRecord;
use serde::Deserialize;
use std::{path::Path, str::FromStr};

/// Expected CSV layout. `user_id` may be absent or blank, in which case a new
/// id is generated.
#[derive(Debug, Deserialize)]
struct CsvUserRow {
    #[serde(default)]
    user_id: Option<String>,
    name: String,
    email: String,
    age: String,
}

/// What to do with a row that has no `user_id`.
#[derive(Debug, Clone, Copy)]
pub enum MissingId<'a> {
    /// A fresh random id. Only for rows read once, as when seeding.
    Generate,
    /// An id derived from the given source name and the row's line number,
    /// stable across reads of the same file.
    Derive(&'a str),
}

/// Converts one raw CSV record using the file's header row.
pub fn parse_user(
    record: &StringRecord,
    headers: &StringRecord,
    missing_id: MissingId<'_>,
) -> Result<UserRecord, FileError> {
    let line = record.position().map(|p| p.line()).unwrap_or_default();
    let row: CsvUserRow =
        record
            .deserialize(Some(headers))
            .map_err(|e| FileError::InvalidRecord {
                line,
                reason: e.to_string(),
            })?;

    let age = BigDecimal::from_str(row.age.trim()).map_err(|e| FileError::InvalidRecord {
        line,
        reason: format!("age '{}': {e}", row.age),
    })?;

    let user = match (row.user_id.filter(|id| !id.trim().is_empty()), missing_id) {
        (Some(id), _) => UserRecord::new(id.trim(), row.name, row.email, age),
        (None, MissingId::Generate) => UserRecord::with_generated_id(row.name, row.email, age),
        (None, MissingId::Derive(source)) => {
            UserRecord::with_derived_id(&format!("{source}:{line}"), row.name, row.email, age)
        }
    };
    Ok(user)
}

/// Reads every user in the file. Used for seeding, where the whole file goes
/// into one transaction anyway.
pub fn read_users(path: &Path) -> Result<Vec<UserRecord>, FileError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    reader
        .records()
        .map(|record| parse_user(&record?, &headers, MissingId::Generate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_rows_with_and_without_ids() {
        let file = csv_file(
            "user_id,name,email,age\n\
             a1,Johnnie Mayer,Ross.Reynolds21@hotmail.com,35\n\
             ,Myrtle Waters,Edmund_Funk@gmail.com,99\n",
        );

        let users = read_users(file.path()).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id, "a1");
        assert_eq!(users[0].age, BigDecimal::from(35));
        assert_eq!(users[1].user_id.len(), 36);
        assert_eq!(users[1].name, "Myrtle Waters");
    }

    #[test]
    fn generates_ids_when_column_is_missing() {
        let file = csv_file("name,email,age\nFlora,flora@example.com,67\n");

        let users = read_users(file.path()).unwrap();
        assert_eq!(users.len(), 1);
        assert!(!users[0].user_id.is_empty());
    }

    #[test]
    fn reports_bad_age_with_line_number() {
        let file = csv_file("user_id,name,email,age\nx,Bad,bad@example.com,old\n");

        match read_users(file.path()) {
            Err(FileError::InvalidRecord { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("old"));
            }
            other => panic!("expected invalid record, got {other:?}"),
        }
    }
}
