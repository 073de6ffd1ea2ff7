use chrono::{DateTime, Utc};
use sqlx::{Row, sqlite::SqliteRow};

use super::error::{DbError, Result};

pub(super) mod candles;
pub(super) mod ranges;

/// Decodes a unix-second `timestamp` column into a UTC instant.
fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let secs: i64 = row.try_get(column).map_err(DbError::Query)?;

    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        DbError::UnexpectedQueryResult(format!("column {column} holds out-of-range value {secs}"))
    })
}
