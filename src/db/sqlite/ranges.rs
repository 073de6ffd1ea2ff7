use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::range::{self, TimeRange};

use super::{
    super::{
        error::{DbError, Result},
        models::CoverageRangeRow,
        repositories::RangesRepository,
    },
    decode_timestamp,
};

pub(crate) struct SqliteRangesRepo {
    pool: SqlitePool,
}

impl SqliteRangesRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RangesRepository for SqliteRangesRepo {
    async fn get_ranges(&self, symbol: &str, timeframe: &str) -> Result<Vec<TimeRange>> {
        let rows = sqlx::query(
            "SELECT start_timestamp, end_timestamp FROM coverage_ranges \
             WHERE symbol = ? AND timeframe = ? \
             ORDER BY start_timestamp ASC",
        )
        .bind(symbol)
        .bind(timeframe)
        .fetch_all(self.pool())
        .await
        .map_err(DbError::Query)?;

        let mut ranges = Vec::with_capacity(rows.len());
        for row in &rows {
            ranges.push(TimeRange::new(
                decode_timestamp(row, "start_timestamp")?,
                decode_timestamp(row, "end_timestamp")?,
            ));
        }

        Ok(ranges)
    }

    async fn put_range(&self, symbol: &str, timeframe: &str, range: TimeRange) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO coverage_ranges \
                 (timeframe, symbol, start_timestamp, end_timestamp) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(timeframe)
        .bind(symbol)
        .bind(range.start().timestamp())
        .bind(range.end().timestamp())
        .execute(self.pool())
        .await
        .map_err(DbError::Query)?;

        Ok(())
    }

    async fn merge_ranges(&self, symbol: &str, timeframe: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::TransactionBegin)?;

        let rows = sqlx::query(
            "SELECT start_timestamp, end_timestamp FROM coverage_ranges \
             WHERE symbol = ? AND timeframe = ? \
             ORDER BY start_timestamp ASC",
        )
        .bind(symbol)
        .bind(timeframe)
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        if rows.is_empty() {
            return Ok(());
        }

        let mut ranges = Vec::with_capacity(rows.len());
        for row in &rows {
            ranges.push(TimeRange::new(
                decode_timestamp(row, "start_timestamp")?,
                decode_timestamp(row, "end_timestamp")?,
            ));
        }

        let merged = range::merge(&ranges);

        sqlx::query("DELETE FROM coverage_ranges WHERE symbol = ? AND timeframe = ?")
            .bind(symbol)
            .bind(timeframe)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;

        for range in merged {
            sqlx::query(
                "INSERT INTO coverage_ranges \
                     (timeframe, symbol, start_timestamp, end_timestamp) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(timeframe)
            .bind(symbol)
            .bind(range.start().timestamp())
            .bind(range.end().timestamp())
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;
        }

        tx.commit().await.map_err(DbError::TransactionCommit)
    }

    async fn latest_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<CoverageRangeRow>> {
        let row = sqlx::query(
            "SELECT timeframe, symbol, start_timestamp, end_timestamp FROM coverage_ranges \
             WHERE symbol = ? AND timeframe = ? \
             ORDER BY end_timestamp DESC \
             LIMIT 1",
        )
        .bind(symbol)
        .bind(timeframe)
        .fetch_optional(self.pool())
        .await
        .map_err(DbError::Query)?;

        row.map(|row| {
            Ok(CoverageRangeRow {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                start: decode_timestamp(&row, "start_timestamp")?,
                end: decode_timestamp(&row, "end_timestamp")?,
            })
        })
        .transpose()
    }

    async fn list_all(&self) -> Result<Vec<CoverageRangeRow>> {
        use sqlx::Row;

        let rows = sqlx::query(
            "SELECT timeframe, symbol, start_timestamp, end_timestamp FROM coverage_ranges \
             ORDER BY symbol ASC, timeframe ASC, start_timestamp ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(DbError::Query)?;

        let mut ranges = Vec::with_capacity(rows.len());
        for row in &rows {
            ranges.push(CoverageRangeRow {
                symbol: row.try_get("symbol").map_err(DbError::Query)?,
                timeframe: row.try_get("timeframe").map_err(DbError::Query)?,
                start: decode_timestamp(row, "start_timestamp")?,
                end: decode_timestamp(row, "end_timestamp")?,
            });
        }

        Ok(ranges)
    }
}
