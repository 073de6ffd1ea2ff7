use std::{sync::Arc, time::Duration};

use tokio::{sync::broadcast, time};
use tracing::info;

use upbit_sdk::{RestClient, RestClientConfig};

use crate::{db::Database, shared::error::ConfigError, util::AbortOnDropHandle};

use super::{
    config::{self, IngestConfig, SymbolTimeframeConfig},
    process::IngestProcess,
    schedule::CycleSchedule,
    source::{CandleSource, UpbitCandleSource},
    state::{IngestReader, IngestStatusManager},
};

/// The ingestion engine: owns the store handle, the exchange client, the
/// validated pair configuration, and the cycle schedule.
///
/// Construction performs every fatal-at-startup validation; [`start`] hands
/// the components to a spawned [`IngestProcess`].
///
/// [`start`]: IngestEngine::start
pub struct IngestEngine {
    config: IngestConfig,
    db: Arc<Database>,
    source: Arc<dyn CandleSource>,
    pairs: Vec<SymbolTimeframeConfig>,
    schedule: CycleSchedule,
    status_manager: Arc<IngestStatusManager>,
}

impl IngestEngine {
    pub fn new(db: Arc<Database>, config: IngestConfig) -> Result<Self, ConfigError> {
        let pairs = config.load_pairs()?;

        let min_base =
            config::min_base_timeframe(&pairs).ok_or(ConfigError::NoPairsConfigured)?;
        let schedule = CycleSchedule::derive(min_base)?;

        let rest_config = RestClientConfig::default()
            .with_base_url(config.api_base_url())
            .with_timeout(config.rest_timeout());
        let api_rest = RestClient::new(rest_config).map_err(|e| ConfigError::ExchangeClient {
            reason: e.to_string(),
        })?;

        info!(
            pairs = pairs.len(),
            cron = schedule.expression(),
            "ingest engine configured"
        );

        Ok(Self {
            config,
            db,
            source: Arc::new(UpbitCandleSource::new(api_rest)),
            pairs,
            schedule,
            status_manager: Arc::new(IngestStatusManager::new()),
        })
    }

    /// Read surface handed to external consumers. Valid to create before
    /// [`start`]; reads are refused until the initial cycle completes.
    ///
    /// [`start`]: IngestEngine::start
    pub fn reader(&self) -> IngestReader {
        IngestReader::new(self.db.clone(), self.status_manager.subscribe())
    }

    /// Spawns the collection process: one initial cycle immediately, then
    /// one cycle per schedule boundary.
    pub fn start(self) -> IngestController {
        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown_timeout = self.config.shutdown_timeout();

        let handle = IngestProcess::spawn(
            (&self.config).into(),
            self.db,
            self.source,
            self.pairs,
            self.schedule,
            shutdown_tx.clone(),
            self.status_manager,
        );

        IngestController {
            handle,
            shutdown_tx,
            shutdown_timeout,
        }
    }
}

/// Owns the spawned ingest process; dropping the controller aborts it.
pub struct IngestController {
    handle: AbortOnDropHandle<()>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_timeout: Duration,
}

impl IngestController {
    /// Signals the process to stop and waits for it to wind down; the task
    /// is aborted if it outlives the shutdown timeout.
    pub async fn shutdown(mut self) {
        if self.shutdown_tx.send(()).is_ok() {
            let _ = time::timeout(self.shutdown_timeout, &mut self.handle).await;
        }
    }
}
