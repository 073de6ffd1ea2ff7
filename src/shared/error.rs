use std::path::PathBuf;

use thiserror::Error;

use super::{TimeframeUnit, UPBIT_MINUTE_UNITS};

#[derive(Error, Debug)]
pub enum TimeframeError {
    #[error("Empty timeframe string")]
    Empty,

    #[error("Unsupported timeframe unit in '{raw}'")]
    UnknownUnit { raw: String },

    #[error("Invalid timeframe value '{raw}'")]
    InvalidValue { raw: String },

    #[error("Timeframe value must be positive in '{raw}'")]
    NonPositiveValue { raw: String },
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    Timeframe(#[from] TimeframeError),

    #[error("Environment variable {name} must be set ({hint})")]
    MissingEnv {
        name: &'static str,
        hint: &'static str,
    },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Config file '{path}' could not be read: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config file '{path}' is not valid YAML: {source}")]
    FileParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("At least one pair must be configured")]
    NoPairsConfigured,

    #[error(
        "Upbit minute candles support only {:?} minute units; got {label}",
        UPBIT_MINUTE_UNITS
    )]
    UnsupportedMinuteBase { label: String },

    #[error("Upbit {unit} candles support only unit value 1; got {label}")]
    UnsupportedCalendarBase { unit: TimeframeUnit, label: String },

    #[error("No aggregation path found for {target}. Ensure a smaller divisible timeframe exists.")]
    NoAggregationPath { target: String },

    #[error("Symbol '{symbol}' not found in the pair configuration")]
    SymbolNotConfigured { symbol: String },

    #[error("Collection must be requested for the base timeframe {base}; got {requested}")]
    NonBaseTimeframe { requested: String, base: String },

    #[error("Timeframe {label} has no fixed duration")]
    TimeframeWithoutDuration { label: String },

    #[error("Scheduling supports minute-based base timeframes only; got {label}")]
    UnschedulableBase { label: String },

    #[error("No cron schedule maps to a {label} collection interval")]
    UnschedulableInterval { label: String },

    #[error("Derived cron expression '{expression}' is invalid: {reason}")]
    ScheduleExpression { expression: String, reason: String },

    #[error("Failed to build exchange client: {reason}")]
    ExchangeClient { reason: String },
}
