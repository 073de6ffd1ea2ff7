use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::*;

fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

fn tf(raw: &str) -> Timeframe {
    raw.parse().expect("valid timeframe")
}

/// Serves a fixed candle set with Upbit's cursor semantics: newest first,
/// strictly earlier than `to`.
struct ScriptedSource {
    candles: Vec<CandleRow>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(mut candles: Vec<CandleRow>) -> Self {
        candles.sort_by_key(|candle| candle.time);
        Self {
            candles,
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleSource for ScriptedSource {
    async fn fetch_candles(
        &self,
        _timeframe: Timeframe,
        _market: &str,
        to: Option<DateTime<Utc>>,
        count: u32,
    ) -> error::Result<Vec<CandleRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let mut page: Vec<CandleRow> = self
            .candles
            .iter()
            .filter(|candle| to.is_none_or(|to| candle.time < to))
            .cloned()
            .collect();

        page.reverse();
        page.truncate(count as usize);
        Ok(page)
    }
}

#[tokio::test]
async fn harvests_a_fully_served_window() {
    let start = utc("2025-01-01T00:00:00Z");
    let candles: Vec<CandleRow> = (0..4)
        .map(|i| CandleRow::new_flat(start + Duration::minutes(i), 100.0 + i as f64, 1.0))
        .collect();

    let source = ScriptedSource::new(candles);
    let task = HarvestTask::new(&source, 1);

    let rows = task
        .run(
            "KRW-BTC",
            tf("1m"),
            TimeRange::new(start, start + Duration::minutes(4)),
            None,
        )
        .await
        .expect("harvest succeeds");

    assert_eq!(rows.len(), 4);
    assert!(rows.windows(2).all(|pair| pair[0].time < pair[1].time));
    assert_eq!(rows[0].close, 100.0);
    assert_eq!(rows[3].close, 103.0);
}

#[tokio::test]
async fn interpolates_gaps_and_drops_trailing_candle() {
    let start = utc("2025-01-01T00:00:00Z");

    // Server only has the 00:00 and 00:03 buckets.
    let source = ScriptedSource::new(vec![
        CandleRow::new_flat(start, 100.0, 1.0),
        CandleRow::new_flat(start + Duration::minutes(3), 130.0, 1.0),
    ]);
    let task = HarvestTask::new(&source, 1);

    let rows = task
        .run(
            "KRW-BTC",
            tf("1m"),
            TimeRange::new(start, start + Duration::minutes(4)),
            Some(start + Duration::minutes(3) + Duration::seconds(30)),
        )
        .await
        .expect("harvest succeeds");

    // 00:03 is dropped: it started less than one bucket before the request.
    let times: Vec<DateTime<Utc>> = rows.iter().map(|row| row.time).collect();
    assert_eq!(
        times,
        vec![
            start,
            start + Duration::minutes(1),
            start + Duration::minutes(2),
        ]
    );

    // The holes are flat copies of the last known close with zero volume.
    for interpolated in &rows[1..] {
        assert_eq!(interpolated.open, 100.0);
        assert_eq!(interpolated.high, 100.0);
        assert_eq!(interpolated.low, 100.0);
        assert_eq!(interpolated.close, 100.0);
        assert_eq!(interpolated.quote_volume, 0.0);
        assert_eq!(interpolated.volume, 0.0);
    }
}

#[tokio::test]
async fn keeps_trailing_candle_once_bucket_closed() {
    let start = utc("2025-01-01T00:00:00Z");
    let candles: Vec<CandleRow> = (0..4)
        .map(|i| CandleRow::new_flat(start + Duration::minutes(i), 100.0, 1.0))
        .collect();

    let source = ScriptedSource::new(candles);
    let task = HarvestTask::new(&source, 1);

    let rows = task
        .run(
            "KRW-BTC",
            tf("1m"),
            TimeRange::new(start, start + Duration::minutes(4)),
            Some(start + Duration::minutes(5)),
        )
        .await
        .expect("harvest succeeds");

    // The 00:03 bucket closed at 00:04, a full bucket before the request.
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn leading_gap_stays_empty_without_prior_close() {
    let start = utc("2025-01-01T00:00:00Z");

    // Nothing known at or before 00:00; only 00:02 exists.
    let source = ScriptedSource::new(vec![CandleRow::new_flat(
        start + Duration::minutes(2),
        120.0,
        1.0,
    )]);
    let task = HarvestTask::new(&source, 0);

    let rows = task
        .run(
            "KRW-BTC",
            tf("1m"),
            TimeRange::new(start, start + Duration::minutes(3)),
            None,
        )
        .await
        .expect("harvest succeeds");

    let times: Vec<DateTime<Utc>> = rows.iter().map(|row| row.time).collect();
    assert_eq!(times, vec![start + Duration::minutes(2)]);
}

#[tokio::test]
async fn overshoot_before_window_seeds_interpolation() {
    let start = utc("2025-01-01T01:00:00Z");

    // The server has an older candle before the window; pagination fetches
    // it and its close seeds the interpolation of the leading hole.
    let source = ScriptedSource::new(vec![
        CandleRow::new_flat(start - Duration::minutes(1), 90.0, 1.0),
        CandleRow::new_flat(start + Duration::minutes(2), 120.0, 1.0),
    ]);
    let task = HarvestTask::new(&source, 1);

    let rows = task
        .run(
            "KRW-BTC",
            tf("1m"),
            TimeRange::new(start, start + Duration::minutes(3)),
            None,
        )
        .await
        .expect("harvest succeeds");

    let times: Vec<DateTime<Utc>> = rows.iter().map(|row| row.time).collect();
    assert_eq!(
        times,
        vec![
            start,
            start + Duration::minutes(1),
            start + Duration::minutes(2),
        ]
    );
    assert_eq!(rows[0].close, 90.0);
    assert_eq!(rows[0].volume, 0.0);
    assert_eq!(rows[2].close, 120.0);
}

#[tokio::test]
async fn retries_consume_the_budget_then_interpolate() {
    let start = utc("2025-01-01T00:00:00Z");

    let source = ScriptedSource::new(vec![
        CandleRow::new_flat(start, 100.0, 1.0),
        CandleRow::new_flat(start + Duration::minutes(3), 130.0, 1.0),
    ]);
    let task = HarvestTask::new(&source, 2);

    let rows = task
        .run(
            "KRW-BTC",
            tf("1m"),
            TimeRange::new(start, start + Duration::minutes(4)),
            None,
        )
        .await
        .expect("harvest succeeds");

    // Initial pass + two retries of the persistent gap.
    assert!(source.fetches() >= 3);
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn rejects_misaligned_candles() {
    let start = utc("2025-01-01T00:00:00Z");

    let source = ScriptedSource::new(vec![CandleRow::new_flat(
        start + Duration::seconds(30),
        100.0,
        1.0,
    )]);
    let task = HarvestTask::new(&source, 0);

    let result = task
        .run(
            "KRW-BTC",
            tf("1m"),
            TimeRange::new(start, start + Duration::minutes(2)),
            None,
        )
        .await;

    assert!(matches!(
        result,
        Err(HarvestError::MisalignedCandleTime { .. })
    ));
}

#[tokio::test]
async fn empty_window_returns_no_rows() {
    let start = utc("2025-01-01T00:00:00Z");
    let source = ScriptedSource::new(Vec::new());
    let task = HarvestTask::new(&source, 1);

    let rows = task
        .run("KRW-BTC", tf("1m"), TimeRange::new(start, start), None)
        .await
        .expect("harvest succeeds");

    assert!(rows.is_empty());
    assert_eq!(source.fetches(), 0);
}
