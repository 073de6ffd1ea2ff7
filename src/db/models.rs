use chrono::{DateTime, Utc};

use crate::range::TimeRange;

/// One stored candle: the OHLCV summary of a single `[t, t + Δ)` bucket.
///
/// `time` is the bucket start. Prices and volumes are non-negative;
/// interpolated placeholder candles carry zero volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleRow {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Accumulated traded value in the quote currency.
    pub quote_volume: f64,
    /// Accumulated traded volume in the base currency.
    pub volume: f64,
}

impl CandleRow {
    #[cfg(test)]
    pub(crate) fn new_flat(time: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            quote_volume: price * volume,
            volume,
        }
    }
}

/// One proven-covered `[start, end)` interval for a `(symbol, timeframe)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRangeRow {
    pub symbol: String,
    pub timeframe: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CoverageRangeRow {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }
}
