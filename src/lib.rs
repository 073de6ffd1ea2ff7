#![doc = include_str!("../README.md")]

mod db;
mod frame;
mod range;
mod shared;
mod util;

/// Exports [`IngestEngine`] and other types related to candle ingestion.
///
/// [`IngestEngine`]: crate::ingest::IngestEngine
pub mod ingest;
/// Exports the [`Strategy`] interface and the built-in strategy registry.
///
/// [`Strategy`]: crate::strategy::Strategy
pub mod strategy;

pub use db::Database;

/// Error types returned by `candlerack`.
pub mod error {
    pub use super::db::error::DbError;
    pub use super::ingest::{
        error::IngestError,
        process::{error::IngestCycleError, harvest_task::error::HarvestError},
    };
    pub use super::shared::error::{ConfigError, TimeframeError};
    pub use super::strategy::error::StrategyError;

    // Re-export the SDK error for convenience
    pub use upbit_sdk::error::RestApiError;

    /// Convenience general-purpose Result type alias.
    pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
}

/// Exports store models, the candle frame, and the timeframe algebra.
pub mod models {
    pub use super::db::models::{CandleRow, CoverageRangeRow};
    pub use super::frame::CandleFrame;
    pub use super::range::TimeRange;
    pub use super::shared::{Timeframe, TimeframeUnit, UPBIT_MINUTE_UNITS};

    // Re-export the exchange zone for convenience
    pub use upbit_sdk::KST;
}
