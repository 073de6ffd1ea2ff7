use chrono::{DateTime, Datelike, NaiveDate, Utc};

use upbit_sdk::KST;

use crate::{
    db::models::CandleRow,
    shared::{Timeframe, TimeframeUnit, error::ConfigError},
    util::{DateTimeExt, kst_to_utc},
};

use super::CandleFrame;

/// Rolls `frame` up into `target` buckets with OHLCV semantics: open =
/// first, high = max, low = min, close = last, volumes = sums.
///
/// Buckets are left-closed and left-labeled; buckets with no source rows
/// are not emitted.
pub(crate) fn resample(frame: &CandleFrame, target: Timeframe) -> Result<CandleFrame, ConfigError> {
    let mut out: Vec<CandleRow> = Vec::new();

    for row in frame.rows() {
        let bucket = bucket_label(row.time, target)?;

        match out.last_mut() {
            Some(current) if current.time == bucket => {
                current.high = current.high.max(row.high);
                current.low = current.low.min(row.low);
                current.close = row.close;
                current.quote_volume += row.quote_volume;
                current.volume += row.volume;
            }
            _ => out.push(CandleRow {
                time: bucket,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                quote_volume: row.quote_volume,
                volume: row.volume,
            }),
        }
    }

    Ok(CandleFrame::from_rows(out))
}

/// Drops trailing target buckets that would summarize an incomplete set of
/// source rows: every emitted bucket `t` must satisfy
/// `t + target Δ <= source_end + source Δ`.
///
/// Calendar targets have no fixed duration and are left untouched; they are
/// never range-proven either.
pub(crate) fn trim_partial_tail(
    frame: &mut CandleFrame,
    source: Timeframe,
    target: Timeframe,
    source_end: DateTime<Utc>,
) -> Result<(), ConfigError> {
    let Some(target_delta) = target.duration() else {
        return Ok(());
    };
    let source_delta = source.duration_checked()?;

    let cover_end = source_end + source_delta;
    frame.retain(|row| row.time + target_delta <= cover_end);

    Ok(())
}

/// Left label of the `target` bucket containing `time`.
fn bucket_label(time: DateTime<Utc>, target: Timeframe) -> Result<DateTime<Utc>, ConfigError> {
    match target.unit() {
        TimeframeUnit::Minute | TimeframeUnit::Day | TimeframeUnit::Week => {
            time.floor_to_timeframe(target)
        }
        TimeframeUnit::Month => {
            let local = time.with_timezone(&KST).date_naive();
            let months = (local.year() as i64 - 1970) * 12 + local.month0() as i64;
            let floored = months - months.rem_euclid(target.value() as i64);

            let year = (1970 + floored.div_euclid(12)) as i32;
            let month = floored.rem_euclid(12) as u32 + 1;

            Ok(kst_month_start(year, month))
        }
        TimeframeUnit::Year => {
            let year = time.with_timezone(&KST).year();
            let floored = year - (year as i64 - 1970).rem_euclid(target.value() as i64) as i32;

            Ok(kst_month_start(floored, 1))
        }
    }
}

fn kst_month_start(year: i32, month: u32) -> DateTime<Utc> {
    let local = NaiveDate::from_ymd_opt(year, month, 1)
        .expect("first of month is always valid")
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid");

    kst_to_utc(local)
}
