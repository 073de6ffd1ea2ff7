use std::{num::NonZeroU32, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    KST,
    config::RestClientConfig,
    error::Result,
    models::{CandleGranularity, MarketCandle},
};

mod base;

use base::UpbitRestBase;

/// Maximum number of candles a single Upbit candle request may return.
pub const MAX_CANDLE_COUNT: u32 = 200;

/// Client for the public Upbit market-data REST API.
pub struct RestClient {
    base: UpbitRestBase,
}

impl RestClient {
    pub fn new(config: RestClientConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self {
            base: UpbitRestBase::new(config)?,
        }))
    }

    /// Fetches up to `count` candles strictly earlier than `to`, newest
    /// first. When `to` is `None` the server pages back from the present.
    ///
    /// `count` is capped at [`MAX_CANDLE_COUNT`]; `to` is rendered as
    /// ISO-8601 Seoul time, matching the timestamps the server reports.
    pub async fn get_candles(
        &self,
        granularity: CandleGranularity,
        market: &str,
        to: Option<DateTime<Utc>>,
        count: NonZeroU32,
    ) -> Result<Vec<MarketCandle>> {
        let count = count.get().min(MAX_CANDLE_COUNT);

        let mut query: Vec<(&str, String)> =
            vec![("market", market.to_string()), ("count", count.to_string())];

        if let Some(to) = to {
            let to_kst = to.with_timezone(&KST).format("%Y-%m-%dT%H:%M:%S%:z");
            query.push(("to", to_kst.to_string()));
        }

        self.base
            .get_json(granularity.to_path_string(), &query)
            .await
    }
}
