use std::result;

use chrono::{DateTime, Utc};
use thiserror::Error;

use upbit_sdk::error::RestApiError;

use crate::shared::error::ConfigError;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("[RestApi] {0}")]
    RestApi(#[from] RestApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Exchange returned a candle at {time} not aligned to {timeframe} buckets")]
    MisalignedCandleTime {
        time: DateTime<Utc>,
        timeframe: String,
    },
}

pub(crate) type Result<T> = result::Result<T, HarvestError>;
