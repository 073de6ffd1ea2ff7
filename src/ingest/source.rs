use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use upbit_sdk::{MAX_CANDLE_COUNT, RestClient};

use crate::{db::models::CandleRow, shared::Timeframe};

use super::process::harvest_task::error::{HarvestError, Result};

/// Seam between the harvester and the exchange.
///
/// Implementations return candles translated to bucket-start domain rows,
/// newest first, strictly earlier than `to`.
#[async_trait]
pub(crate) trait CandleSource: Send + Sync {
    async fn fetch_candles(
        &self,
        timeframe: Timeframe,
        market: &str,
        to: Option<DateTime<Utc>>,
        count: u32,
    ) -> Result<Vec<CandleRow>>;
}

/// [`CandleSource`] backed by the Upbit REST API.
///
/// The server reports each candle's close time; the bucket start is
/// `close − Δ`.
pub(crate) struct UpbitCandleSource {
    api_rest: Arc<RestClient>,
}

impl UpbitCandleSource {
    pub fn new(api_rest: Arc<RestClient>) -> Self {
        Self { api_rest }
    }
}

#[async_trait]
impl CandleSource for UpbitCandleSource {
    async fn fetch_candles(
        &self,
        timeframe: Timeframe,
        market: &str,
        to: Option<DateTime<Utc>>,
        count: u32,
    ) -> Result<Vec<CandleRow>> {
        let delta = timeframe.duration_checked()?;

        let count = NonZeroU32::new(count.clamp(1, MAX_CANDLE_COUNT)).expect("clamped above zero");

        let page = self
            .api_rest
            .get_candles(timeframe.granularity(), market, to, count)
            .await
            .map_err(HarvestError::RestApi)?;

        Ok(page
            .into_iter()
            .map(|candle| CandleRow {
                time: candle.close_time() - delta,
                open: candle.opening_price(),
                high: candle.high_price(),
                low: candle.low_price(),
                close: candle.trade_price(),
                quote_volume: candle.candle_acc_trade_price(),
                volume: candle.candle_acc_trade_volume(),
            })
            .collect())
    }
}
