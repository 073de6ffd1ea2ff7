use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::KST;

/// Candle granularity accepted by the Upbit candle endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleGranularity {
    /// `/candles/minutes/{unit}`; Upbit accepts units 1, 3, 5, 15, 30, 60
    /// and 240.
    Minutes(u32),
    Days,
    Weeks,
    Months,
    Years,
}

impl CandleGranularity {
    pub(crate) fn to_path_string(self) -> String {
        match self {
            Self::Minutes(unit) => format!("/candles/minutes/{unit}"),
            Self::Days => "/candles/days".to_string(),
            Self::Weeks => "/candles/weeks".to_string(),
            Self::Months => "/candles/months".to_string(),
            Self::Years => "/candles/years".to_string(),
        }
    }
}

impl fmt::Display for CandleGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(unit) => write!(f, "minutes/{unit}"),
            Self::Days => write!(f, "days"),
            Self::Weeks => write!(f, "weeks"),
            Self::Months => write!(f, "months"),
            Self::Years => write!(f, "years"),
        }
    }
}

/// A single candle as returned by the Upbit candle endpoints.
///
/// The server reports candles newest first. `candle_date_time_kst` is the
/// close time of the candle's bucket, expressed as Seoul wall-clock time
/// without an offset.
#[derive(Deserialize, Debug, Clone)]
pub struct MarketCandle {
    market: String,
    candle_date_time_kst: NaiveDateTime,
    opening_price: f64,
    high_price: f64,
    low_price: f64,
    trade_price: f64,
    candle_acc_trade_price: f64,
    candle_acc_trade_volume: f64,
}

impl MarketCandle {
    /// Market code, e.g. `KRW-BTC`.
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Close time of the bucket as Seoul wall-clock time.
    pub fn candle_date_time_kst(&self) -> NaiveDateTime {
        self.candle_date_time_kst
    }

    /// Close time of the bucket as a UTC instant.
    pub fn close_time(&self) -> DateTime<Utc> {
        self.candle_date_time_kst
            .and_local_timezone(KST)
            .single()
            .expect("Seoul wall-clock times map to a single instant")
            .with_timezone(&Utc)
    }

    /// Opening price.
    pub fn opening_price(&self) -> f64 {
        self.opening_price
    }

    /// Highest price.
    pub fn high_price(&self) -> f64 {
        self.high_price
    }

    /// Lowest price.
    pub fn low_price(&self) -> f64 {
        self.low_price
    }

    /// Closing price.
    pub fn trade_price(&self) -> f64 {
        self.trade_price
    }

    /// Accumulated traded value (quote currency).
    pub fn candle_acc_trade_price(&self) -> f64 {
        self.candle_acc_trade_price
    }

    /// Accumulated traded volume (base currency).
    pub fn candle_acc_trade_volume(&self) -> f64 {
        self.candle_acc_trade_volume
    }
}
