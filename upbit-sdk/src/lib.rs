#![doc = include_str!("../README.md")]

mod config;
mod limiter;
mod rest;

/// Error types returned by `upbit-sdk`.
pub mod error;
/// Exports [`MarketCandle`], [`CandleGranularity`], and related types.
///
/// [`MarketCandle`]: crate::models::MarketCandle
/// [`CandleGranularity`]: crate::models::CandleGranularity
pub mod models;

pub use config::{RestClientConfig, UPBIT_API_BASE_URL};
pub use rest::{MAX_CANDLE_COUNT, RestClient};

/// Seoul wall-clock zone used by Upbit candle timestamps.
pub const KST: chrono_tz::Tz = chrono_tz::Asia::Seoul;
