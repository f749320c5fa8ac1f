use crate::sql::error::DbError;
use bigdecimal::BigDecimal;
use model::records::user::UserRecord;
use mysql_async::{Row, prelude::FromValue};

/// Converts a `user_data` result row into a record.
pub fn to_user_record(mut row: Row) -> Result<UserRecord, DbError> {
    Ok(UserRecord {
        user_id: take_column::<String>(&mut row, "user_id")?,
        name: take_column::<String>(&mut row, "name")?,
        email: take_column::<String>(&mut row, "email")?,
        age: take_column::<BigDecimal>(&mut row, "age")?,
    })
}

fn take_column<T: FromValue>(row: &mut Row, column: &str) -> Result<T, DbError> {
    match row.take_opt::<T, _>(column) {
        Some(Ok(value)) => Ok(value),
        Some(Err(err)) => Err(DbError::decode(column, err)),
        None => Err(DbError::MissingColumn(column.to_string())),
    }
}
