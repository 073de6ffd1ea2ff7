use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, sqlite::SqlitePool};

use crate::frame::CandleFrame;

use super::{
    super::{
        error::{DbError, Result},
        models::CandleRow,
        repositories::CandlesRepository,
    },
    decode_timestamp,
};

pub(crate) struct SqliteCandlesRepo {
    pool: SqlitePool,
}

impl SqliteCandlesRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CandlesRepository for SqliteCandlesRepo {
    async fn upsert_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        rows: &[CandleRow],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(DbError::TransactionBegin)?;

        for row in rows {
            sqlx::query(
                "INSERT INTO candles \
                     (timeframe, symbol, timestamp, open, high, low, close, quote_volume, volume) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (timeframe, symbol, timestamp) DO UPDATE \
                 SET open = excluded.open, \
                     high = excluded.high, \
                     low = excluded.low, \
                     close = excluded.close, \
                     quote_volume = excluded.quote_volume, \
                     volume = excluded.volume",
            )
            .bind(timeframe)
            .bind(symbol)
            .bind(row.time.timestamp())
            .bind(row.open)
            .bind(row.high)
            .bind(row.low)
            .bind(row.close)
            .bind(row.quote_volume)
            .bind(row.volume)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;
        }

        tx.commit().await.map_err(DbError::TransactionCommit)
    }

    async fn count_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM candles \
             WHERE symbol = ? AND timeframe = ? AND timestamp >= ? AND timestamp < ?",
        )
        .bind(symbol)
        .bind(timeframe)
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_one(self.pool())
        .await
        .map_err(DbError::Query)?;

        Ok(count as u64)
    }

    async fn get_frame(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleFrame> {
        let mut sql = String::from(
            "SELECT timestamp, open, high, low, close, quote_volume, volume \
             FROM candles WHERE symbol = ? AND timeframe = ?",
        );
        if start.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if end.is_some() {
            sql.push_str(" AND timestamp <= ?");
        }
        sql.push_str(" ORDER BY timestamp ASC");

        let mut query = sqlx::query(&sql).bind(symbol).bind(timeframe);
        if let Some(start) = start {
            query = query.bind(start.timestamp());
        }
        if let Some(end) = end {
            query = query.bind(end.timestamp());
        }

        let rows = query
            .fetch_all(self.pool())
            .await
            .map_err(DbError::Query)?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            candles.push(CandleRow {
                time: decode_timestamp(row, "timestamp")?,
                open: row.try_get("open").map_err(DbError::Query)?,
                high: row.try_get("high").map_err(DbError::Query)?,
                low: row.try_get("low").map_err(DbError::Query)?,
                close: row.try_get("close").map_err(DbError::Query)?,
                quote_volume: row.try_get("quote_volume").map_err(DbError::Query)?,
                volume: row.try_get("volume").map_err(DbError::Query)?,
            });
        }

        Ok(CandleFrame::from_rows(candles))
    }
}
