use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::{
    db::{
        Database,
        models::CoverageRangeRow,
    },
    frame::CandleFrame,
};

use super::error::IngestError;

/// Ingest lifecycle as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    /// The engine is configured but has not started collecting.
    Starting,
    /// The initial collection cycle is running; reads are refused.
    InitialCycle,
    /// The initial cycle completed; reads are served.
    Ready { last_cycle: DateTime<Utc> },
}

impl IngestStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, IngestStatus::Ready { .. })
    }
}

pub(crate) struct IngestStatusManager {
    tx: watch::Sender<IngestStatus>,
}

impl IngestStatusManager {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(IngestStatus::Starting);
        Self { tx }
    }

    pub fn update(&self, status: IngestStatus) {
        self.tx.send_replace(status);
    }

    pub fn subscribe(&self) -> watch::Receiver<IngestStatus> {
        self.tx.subscribe()
    }
}

/// Read-only consumer surface over the store, gated on ingest readiness.
///
/// Every accessor refuses with [`IngestError::ServiceUnavailable`] until the
/// initial collection cycle has completed. Afterwards, queries over
/// uncovered spans yield empty or partial frames rather than errors; callers
/// interpret results against [`covered_ranges`].
///
/// [`covered_ranges`]: IngestReader::covered_ranges
#[derive(Clone)]
pub struct IngestReader {
    db: Arc<Database>,
    status_rx: watch::Receiver<IngestStatus>,
}

impl IngestReader {
    pub(crate) fn new(db: Arc<Database>, status_rx: watch::Receiver<IngestStatus>) -> Self {
        Self { db, status_rx }
    }

    pub fn status(&self) -> IngestStatus {
        self.status_rx.borrow().clone()
    }

    /// Waits until the initial collection cycle has completed.
    pub async fn wait_ready(&self) -> Result<(), IngestError> {
        let mut status_rx = self.status_rx.clone();

        status_rx
            .wait_for(IngestStatus::is_ready)
            .await
            .map_err(|_| IngestError::ServiceStopped)?;

        Ok(())
    }

    /// Candles for `(symbol, timeframe)` in ascending timestamp order.
    /// `start` is inclusive; `end` is inclusive when given.
    pub async fn dataframe(
        &self,
        symbol: &str,
        timeframe: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CandleFrame, IngestError> {
        self.ensure_ready()?;

        Ok(self.db.candles.get_frame(symbol, timeframe, start, end).await?)
    }

    /// Every proven-covered range, across all symbols and timeframes.
    pub async fn covered_ranges(&self) -> Result<Vec<CoverageRangeRow>, IngestError> {
        self.ensure_ready()?;

        Ok(self.db.ranges.list_all().await?)
    }

    /// Most recent covered range for `(symbol, timeframe)`, by end.
    pub async fn latest_range(
        &self,
        symbol: &str,
        timeframe: &str,
    ) -> Result<Option<CoverageRangeRow>, IngestError> {
        self.ensure_ready()?;

        Ok(self.db.ranges.latest_range(symbol, timeframe).await?)
    }

    fn ensure_ready(&self) -> Result<(), IngestError> {
        if self.status_rx.borrow().is_ready() {
            Ok(())
        } else {
            Err(IngestError::ServiceUnavailable)
        }
    }
}
