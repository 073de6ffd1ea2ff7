use chrono::{DateTime, Duration, Utc};

use crate::{db::models::CandleRow, shared::Timeframe};

use super::{CandleFrame, resample::resample, resample::trim_partial_tail};

fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn tf(raw: &str) -> Timeframe {
    raw.parse().expect("valid timeframe")
}

fn minute_candles(start: DateTime<Utc>, count: usize) -> Vec<CandleRow> {
    (0..count)
        .map(|i| CandleRow {
            time: start + Duration::minutes(i as i64),
            open: 10.0 + i as f64,
            high: 12.0 + i as f64,
            low: 9.0 + i as f64,
            close: 11.0 + i as f64,
            quote_volume: 100.0,
            volume: 1.0,
        })
        .collect()
}

#[test]
fn from_rows_sorts_by_time() {
    let start = utc("2025-01-01T00:00:00Z");
    let mut rows = minute_candles(start, 3);
    rows.reverse();

    let frame = CandleFrame::from_rows(rows);

    assert_eq!(frame.first().unwrap().time, start);
    assert_eq!(
        frame.last().unwrap().time,
        start + Duration::minutes(2)
    );
}

#[test]
fn resamples_five_minutes_with_ohlcv_semantics() {
    let start = utc("2025-01-01T00:00:00Z");
    let frame = CandleFrame::from_rows(minute_candles(start, 5));

    let resampled = resample(&frame, tf("5m")).unwrap();

    assert_eq!(resampled.len(), 1);
    let bucket = resampled.first().unwrap();
    assert_eq!(bucket.time, start);
    assert_eq!(bucket.open, 10.0);
    assert_eq!(bucket.high, 16.0);
    assert_eq!(bucket.low, 9.0);
    assert_eq!(bucket.close, 15.0);
    assert_eq!(bucket.quote_volume, 500.0);
    assert_eq!(bucket.volume, 5.0);
}

#[test]
fn edge_guard_drops_partial_tail_bucket() {
    let start = utc("2025-01-01T00:00:00Z");

    // Six minute candles: the sixth opens a new 5m bucket that is not yet
    // fully backed by source rows.
    let rows = minute_candles(start, 6);
    let source_end = rows.last().unwrap().time;
    let frame = CandleFrame::from_rows(rows);

    let mut resampled = resample(&frame, tf("5m")).unwrap();
    assert_eq!(resampled.len(), 2);

    trim_partial_tail(&mut resampled, tf("1m"), tf("5m"), source_end).unwrap();

    assert_eq!(resampled.len(), 1);
    assert_eq!(resampled.first().unwrap().time, start);
}

#[test]
fn edge_guard_keeps_exactly_covered_tail() {
    let start = utc("2025-01-01T00:00:00Z");

    let rows = minute_candles(start, 10);
    let source_end = rows.last().unwrap().time;
    let frame = CandleFrame::from_rows(rows);

    let mut resampled = resample(&frame, tf("5m")).unwrap();
    trim_partial_tail(&mut resampled, tf("1m"), tf("5m"), source_end).unwrap();

    // Both 5m buckets are fully backed by ten minute candles.
    assert_eq!(resampled.len(), 2);
}

#[test]
fn resamples_hours_into_seoul_day_buckets() {
    // 2024-12-31T15:00Z is 2025-01-01T00:00 KST.
    let day_start = utc("2024-12-31T15:00:00Z");
    let rows: Vec<CandleRow> = (0..24)
        .map(|i| CandleRow {
            time: day_start + Duration::hours(i),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            quote_volume: 10.0,
            volume: 0.1,
        })
        .collect();

    let resampled = resample(&CandleFrame::from_rows(rows), tf("1d")).unwrap();

    assert_eq!(resampled.len(), 1);
    assert_eq!(resampled.first().unwrap().time, day_start);
}

#[test]
fn resamples_days_into_seoul_month_buckets() {
    // January and February 2025 daily closes, in KST days.
    let jan_start = utc("2024-12-31T15:00:00Z");
    let rows: Vec<CandleRow> = (0..59)
        .map(|i| CandleRow {
            time: jan_start + Duration::days(i),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            quote_volume: 1.0,
            volume: 1.0,
        })
        .collect();

    let resampled = resample(&CandleFrame::from_rows(rows), tf("1M")).unwrap();

    assert_eq!(resampled.len(), 2);
    assert_eq!(resampled.first().unwrap().time, jan_start);
    assert_eq!(resampled.first().unwrap().volume, 31.0);
    assert_eq!(
        resampled.last().unwrap().time,
        jan_start + Duration::days(31)
    );
    assert_eq!(resampled.last().unwrap().volume, 28.0);
}

#[test]
fn resamples_days_into_year_buckets() {
    let rows: Vec<CandleRow> = (0..40)
        .map(|i| CandleRow {
            time: utc("2024-12-01T15:00:00Z") + Duration::days(i),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            quote_volume: 1.0,
            volume: 1.0,
        })
        .collect();

    let resampled = resample(&CandleFrame::from_rows(rows), tf("1y")).unwrap();

    // December 2024 (KST) falls in the 2024 bucket, January 2025 in 2025.
    assert_eq!(resampled.len(), 2);
    assert_eq!(resampled.first().unwrap().volume, 30.0);
    assert_eq!(resampled.last().unwrap().volume, 10.0);
}
