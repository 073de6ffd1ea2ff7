use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{sync::broadcast, time};
use tracing::{debug, info, warn};

use crate::{
    db::Database,
    frame::{CandleFrame, resample},
    range::{self, TimeRange},
    shared::{Timeframe, error::ConfigError},
    util::{AbortOnDropHandle, DateTimeExt, Never},
};

use super::{
    config::{IngestProcessConfig, SymbolTimeframeConfig},
    schedule::CycleSchedule,
    source::CandleSource,
    state::{IngestStatus, IngestStatusManager},
};

pub(crate) mod error;
pub(crate) mod harvest_task;

use error::Result;
use harvest_task::HarvestTask;


/// Long-lived collection process: one initial cycle at startup, then one
/// cycle per schedule boundary.
pub(super) struct IngestProcess {
    config: IngestProcessConfig,
    db: Arc<Database>,
    source: Arc<dyn CandleSource>,
    pairs: Vec<SymbolTimeframeConfig>,
    schedule: CycleSchedule,
    shutdown_tx: broadcast::Sender<()>,
    status_manager: Arc<IngestStatusManager>,
}

impl IngestProcess {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        config: IngestProcessConfig,
        db: Arc<Database>,
        source: Arc<dyn CandleSource>,
        pairs: Vec<SymbolTimeframeConfig>,
        schedule: CycleSchedule,
        shutdown_tx: broadcast::Sender<()>,
        status_manager: Arc<IngestStatusManager>,
    ) -> AbortOnDropHandle<()> {
        tokio::spawn(async move {
            let process = Self {
                config,
                db,
                source,
                pairs,
                schedule,
                shutdown_tx,
                status_manager,
            };

            process.run().await
        })
        .into()
    }

    async fn run(self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::select! {
            _ = self.collection_loop() => {}
            _ = shutdown_rx.recv() => {}
        }
    }

    async fn collection_loop(&self) -> Never {
        info!(cron = self.schedule.expression(), "starting initial collection cycle");
        self.status_manager.update(IngestStatus::InitialCycle);

        self.run_cycle().await;
        self.status_manager.update(IngestStatus::Ready {
            last_cycle: Utc::now(),
        });
        info!("initial collection cycle completed");

        loop {
            match self.schedule.next_occurrence(Utc::now()) {
                Ok(next) => {
                    if let Ok(wait) = (next - Utc::now()).to_std() {
                        time::sleep(wait).await;
                    }

                    // Give the exchange a moment to settle the just-closed
                    // bucket.
                    time::sleep(self.config.execution_offset()).await;

                    self.run_cycle().await;
                    self.status_manager.update(IngestStatus::Ready {
                        last_cycle: Utc::now(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "could not compute next cycle boundary");
                    time::sleep(std::time::Duration::from_secs(60)).await;
                }
            }
        }
    }

    /// One collection cycle over all configured pairs. A failing symbol does
    /// not stop the others.
    async fn run_cycle(&self) {
        let request_time = Utc::now();

        for cfg in &self.pairs {
            if let Err(e) = self.collect_symbol(cfg, request_time).await {
                warn!(symbol = cfg.symbol(), error = %e, "collection failed for symbol");
            }
        }
    }

    async fn collect_symbol(
        &self,
        cfg: &SymbolTimeframeConfig,
        request_time: DateTime<Utc>,
    ) -> Result<()> {
        let base = cfg.base();

        let end = request_time.floor_to_timeframe(base)?;
        let start = self.config.collect_start().floor_to_timeframe(base)?;
        if start >= end {
            return Ok(());
        }

        debug!(
            symbol = cfg.symbol(),
            timeframe = %base,
            start = %start.format_kst(),
            end = %end.format_kst(),
            "collecting"
        );

        self.collect_range(cfg, base, TimeRange::new(start, end), Some(request_time))
            .await
    }

    /// Collects every missing sub-range of `window` for the pair's base
    /// timeframe: harvest, persist, prove completeness, then cascade the
    /// aggregations.
    ///
    /// Only the rightmost missing segment is subject to the trailing-candle
    /// drop; interior segments are historical and fully closed.
    pub(in crate::ingest) async fn collect_range(
        &self,
        cfg: &SymbolTimeframeConfig,
        timeframe: Timeframe,
        window: TimeRange,
        request_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if timeframe != cfg.base() {
            return Err(ConfigError::NonBaseTimeframe {
                requested: timeframe.label(),
                base: cfg.base().label(),
            }
            .into());
        }

        let base = cfg.base();
        let base_label = base.label();
        let delta = base.duration_checked()?;

        let existing = self.db.ranges.get_ranges(cfg.symbol(), &base_label).await?;
        let missing = range::subtract(&existing, window);

        let harvester = HarvestTask::new(self.source.as_ref(), self.config.max_retry());

        for segment in missing {
            let capture_request_time = request_time.filter(|_| segment.end() == window.end());

            let rows = harvester
                .run(cfg.symbol(), base, segment, capture_request_time)
                .await?;
            if rows.is_empty() {
                continue;
            }

            self.db
                .candles
                .upsert_candles(cfg.symbol(), &base_label, &rows)
                .await?;
            debug!(symbol = cfg.symbol(), timeframe = %base, count = rows.len(), "persisted raw candles");

            let range_start = rows.first().expect("not empty").time;
            let last_time = rows.last().expect("not empty").time;

            self.prove_and_record(cfg.symbol(), base, TimeRange::new(range_start, last_time + delta))
                .await?;

            self.build_aggregations(cfg, range_start, last_time).await?;
        }

        Ok(())
    }

    /// Records `covered` only when a recount confirms that every expected
    /// bucket in it has a candle row. An unproven range is left unrecorded
    /// for the next cycle to retry.
    async fn prove_and_record(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        covered: TimeRange,
    ) -> Result<()> {
        let delta = timeframe.duration_checked()?;

        let expected = (covered.end() - covered.start()).num_seconds() / delta.num_seconds();
        if expected <= 0 {
            return Ok(());
        }

        let label = timeframe.label();
        let present = self
            .db
            .candles
            .count_candles(symbol, &label, covered.start(), covered.end())
            .await?;

        if present < expected as u64 {
            warn!(
                symbol,
                timeframe = %timeframe,
                range = %covered,
                present,
                expected,
                "skipping range record: missing candles"
            );
            return Ok(());
        }

        let existing = self.db.ranges.get_ranges(symbol, &label).await?;
        if range::is_covered(&existing, covered) {
            return Ok(());
        }

        self.db.ranges.put_range(symbol, &label, covered).await?;
        self.db.ranges.merge_ranges(symbol, &label).await?;
        debug!(symbol, timeframe = %timeframe, range = %covered, "recorded covered range");

        Ok(())
    }

    /// Cascades the freshly covered base span into every coarser target.
    ///
    /// Targets are visited in ascending order, each sourced from its largest
    /// already-aggregated predecessor, so coarser frames build on finer ones
    /// produced in the same pass.
    async fn build_aggregations(
        &self,
        cfg: &SymbolTimeframeConfig,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<()> {
        let base = cfg.base();

        let base_frame = self
            .db
            .candles
            .get_frame(cfg.symbol(), &base.label(), Some(start), Some(end))
            .await?;
        if base_frame.is_empty() {
            return Ok(());
        }

        let mut frames: Vec<(Timeframe, CandleFrame)> = vec![(base, base_frame)];

        for target in cfg.targets().iter().copied() {
            if target == base {
                continue;
            }

            let available: Vec<Timeframe> = frames.iter().map(|(timeframe, _)| *timeframe).collect();
            let Some(source) = cfg.select_source(target, &available) else {
                return Err(ConfigError::NoAggregationPath {
                    target: target.label(),
                }
                .into());
            };

            let resampled = {
                let (_, source_frame) = frames
                    .iter()
                    .find(|(timeframe, _)| *timeframe == source)
                    .expect("source selected from available frames");

                let mut resampled = resample::resample(source_frame, target)?;

                // A bucket labeled before the span start would summarize
                // source rows the span does not fully contain.
                resampled.retain(|row| row.time >= start);

                let source_end = source_frame.last().expect("not empty").time;
                resample::trim_partial_tail(&mut resampled, source, target, source_end)?;

                resampled
            };

            if resampled.is_empty() {
                continue;
            }

            debug!(
                symbol = cfg.symbol(),
                source = %source,
                target = %target,
                rows = resampled.len(),
                "aggregated"
            );

            let label = target.label();
            self.db
                .candles
                .upsert_candles(cfg.symbol(), &label, resampled.rows())
                .await?;

            if let Some(target_delta) = target.duration() {
                let first = resampled.first().expect("not empty").time;
                let last = resampled.last().expect("not empty").time;

                self.prove_and_record(cfg.symbol(), target, TimeRange::new(first, last + target_delta))
                    .await?;
            }

            frames.push((target, resampled));
        }

        Ok(())
    }
}
