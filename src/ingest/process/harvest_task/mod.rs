use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use upbit_sdk::MAX_CANDLE_COUNT;

use crate::{
    db::models::CandleRow,
    ingest::source::CandleSource,
    range::TimeRange,
    shared::Timeframe,
    util::DateTimeExt,
};

pub(crate) mod error;

use error::{HarvestError, Result};

#[cfg(test)]
mod tests;

/// Produces candles for one missing `[start, end)` sub-range of a base
/// timeframe.
///
/// Pages the exchange backward "to-cursor" from each segment's right edge,
/// recomputes the gaps left on the expected bucket grid, retries them up to
/// the budget, then interpolates residual holes with flat zero-volume
/// placeholders. When a request time is given and the last harvested bucket
/// is still open relative to it, that bucket is dropped.
pub(in crate::ingest) struct HarvestTask<'a> {
    source: &'a dyn CandleSource,
    max_retry: u32,
}

impl<'a> HarvestTask<'a> {
    pub fn new(source: &'a dyn CandleSource, max_retry: u32) -> Self {
        Self { source, max_retry }
    }

    pub async fn run(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: TimeRange,
        request_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<CandleRow>> {
        let delta = timeframe.duration_checked()?;
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let mut harvested: BTreeMap<DateTime<Utc>, CandleRow> = BTreeMap::new();
        let mut pending = vec![window];
        let mut attempt = 0u32;

        while !pending.is_empty() && attempt <= self.max_retry {
            let mut next_segments = Vec::new();

            for segment in &pending {
                debug!(symbol, timeframe = %timeframe, %segment, attempt, "downloading segment");

                for candle in self.download_segment(symbol, timeframe, *segment, delta).await? {
                    validate_alignment(&candle, timeframe)?;
                    harvested.insert(candle.time, candle);
                }

                next_segments.extend(missing_segments(*segment, delta, &harvested));
            }

            pending = next_segments;
            attempt += 1;
        }

        if !pending.is_empty() {
            debug!(symbol, timeframe = %timeframe, gaps = pending.len(), "interpolating residual gaps");

            for segment in &pending {
                for candle in interpolate(*segment, delta, &harvested) {
                    harvested.insert(candle.time, candle);
                }
            }
        }

        let mut rows: Vec<CandleRow> = harvested
            .into_values()
            .filter(|row| row.time >= window.start() && row.time < window.end())
            .collect();

        if let Some(request_time) = request_time
            && let Some(last) = rows.last()
            && request_time - last.time < delta
        {
            debug!(symbol, timeframe = %timeframe, time = %last.time, "dropping trailing candle pending confirmation");
            rows.pop();
        }

        Ok(rows)
    }

    /// Pages backward from the segment's right edge until the segment start
    /// is passed, the server runs dry, or the expected count is satisfied.
    async fn download_segment(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        segment: TimeRange,
        delta: Duration,
    ) -> Result<Vec<CandleRow>> {
        let mut candles: Vec<CandleRow> = Vec::new();
        let mut cursor = segment.end();

        let span_secs = (segment.end() - segment.start()).num_seconds();
        let delta_secs = delta.num_seconds();
        let mut remaining = (span_secs + delta_secs - 1) / delta_secs;

        while remaining > 0 {
            let batch = remaining.min(MAX_CANDLE_COUNT as i64) as u32;

            let page = self
                .source
                .fetch_candles(timeframe, symbol, Some(cursor), batch)
                .await?;

            if page.is_empty() {
                break;
            }

            remaining -= page.len() as i64;
            candles.extend(page);

            cursor = candles.last().expect("not empty").time;
            if cursor <= segment.start() {
                break;
            }
        }

        debug!(symbol, timeframe = %timeframe, count = candles.len(), "downloaded candles");
        Ok(candles)
    }
}

/// Gaps left in `segment` on the expected bucket grid.
fn missing_segments(
    segment: TimeRange,
    delta: Duration,
    harvested: &BTreeMap<DateTime<Utc>, CandleRow>,
) -> Vec<TimeRange> {
    let mut missing = Vec::new();
    let mut gap_start: Option<DateTime<Utc>> = None;

    let mut cursor = segment.start();
    while cursor < segment.end() {
        if !harvested.contains_key(&cursor) {
            gap_start.get_or_insert(cursor);
        } else if let Some(start) = gap_start.take() {
            missing.push(TimeRange::new(start, cursor));
        }

        cursor += delta;
    }

    if let Some(start) = gap_start {
        missing.push(TimeRange::new(start, segment.end()));
    }

    missing
}

/// Synthesizes flat placeholder candles for buckets still missing in
/// `segment`, carrying the close of the last known candle forward with zero
/// traded value and volume. Buckets before the first known candle stay
/// empty.
fn interpolate(
    segment: TimeRange,
    delta: Duration,
    harvested: &BTreeMap<DateTime<Utc>, CandleRow>,
) -> Vec<CandleRow> {
    let mut last_known = harvested
        .range(..segment.start())
        .next_back()
        .map(|(_, row)| row.clone());

    let mut synthesized = Vec::new();

    let mut cursor = segment.start();
    while cursor < segment.end() {
        if let Some(row) = harvested.get(&cursor) {
            last_known = Some(row.clone());
        } else if let Some(last) = &last_known {
            synthesized.push(CandleRow {
                time: cursor,
                open: last.close,
                high: last.close,
                low: last.close,
                close: last.close,
                quote_volume: 0.0,
                volume: 0.0,
            });
        }

        cursor += delta;
    }

    synthesized
}

fn validate_alignment(candle: &CandleRow, timeframe: Timeframe) -> Result<()> {
    let aligned = candle.time.floor_to_timeframe(timeframe)?;

    if aligned != candle.time {
        return Err(HarvestError::MisalignedCandleTime {
            time: candle.time,
            timeframe: timeframe.label(),
        });
    }

    Ok(())
}
