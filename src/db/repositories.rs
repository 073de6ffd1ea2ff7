use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{frame::CandleFrame, range::TimeRange};

use super::{
    error::Result,
    models::{CandleRow, CoverageRangeRow},
};

#[async_trait]
pub(crate) trait CandlesRepository: Send + Sync {
    /// Inserts or overwrites candles in a single transaction.
    ///
    /// The conflict key is `(timeframe, symbol, timestamp)`; on conflict the
    /// OHLCV fields are replaced. Rows are never deleted through this
    /// repository.
    async fn upsert_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        rows: &[CandleRow],
    ) -> Result<()>;

    /// Exact number of candles stored in `[start, end)`. Used for
    /// completeness proofs.
    async fn count_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64>;

    /// Candles in ascending timestamp order. Both bounds are optional;
    /// `start` is inclusive and `end` is inclusive when given.
    async fn get_frame(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleFrame>;
}

#[async_trait]
pub(crate) trait RangesRepository: Send + Sync {
    /// Covered ranges for `(symbol, timeframe)`, sorted by start.
    async fn get_ranges(&self, symbol: &str, timeframe: &str) -> Result<Vec<TimeRange>>;

    /// Records a proven-covered range. Idempotent on the composite key.
    async fn put_range(&self, symbol: &str, timeframe: &str, range: TimeRange) -> Result<()>;

    /// Rewrites the stored ranges for `(symbol, timeframe)` as their minimal
    /// covering set, in one transaction.
    async fn merge_ranges(&self, symbol: &str, timeframe: &str) -> Result<()>;

    /// Most recent covered range by end.
    async fn latest_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<CoverageRangeRow>>;

    /// Every covered range across all symbols and timeframes.
    async fn list_all(&self) -> Result<Vec<CoverageRangeRow>>;
}
