use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::{
    shared::{Timeframe, TimeframeUnit, UPBIT_MINUTE_UNITS, error::ConfigError},
    util::kst_to_utc,
};

type Result<T> = std::result::Result<T, ConfigError>;

/// Per-symbol ingestion plan: the base timeframe fetched from the exchange
/// and the targets served to consumers.
///
/// Construction validates the base against Upbit's granularities and checks
/// that every target is reachable through the aggregation graph, so a held
/// value is always ingestable.
#[derive(Debug, Clone)]
pub struct SymbolTimeframeConfig {
    symbol: String,
    base: Timeframe,
    targets: Vec<Timeframe>,
}

impl SymbolTimeframeConfig {
    pub fn new(
        symbol: impl Into<String>,
        base: Timeframe,
        mut targets: Vec<Timeframe>,
    ) -> Result<Self> {
        if !targets.contains(&base) {
            targets.push(base);
        }
        targets.sort_by_key(Timeframe::sort_key);
        targets.dedup();

        let config = Self {
            symbol: symbol.into(),
            base,
            targets,
        };

        config.validate_base_supported()?;
        config.validate_hierarchy()?;

        Ok(config)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn base(&self) -> Timeframe {
        self.base
    }

    /// Targets in ascending timeframe order, base included.
    pub fn targets(&self) -> &[Timeframe] {
        &self.targets
    }

    pub fn max_timeframe(&self) -> Timeframe {
        *self.targets.last().expect("base is always present")
    }

    /// Largest timeframe in `available` that is aggregable to `target`.
    pub(crate) fn select_source(
        &self,
        target: Timeframe,
        available: &[Timeframe],
    ) -> Option<Timeframe> {
        available
            .iter()
            .copied()
            .filter(|source| source.sort_key() < target.sort_key())
            .filter(|source| source.can_aggregate_to(target))
            .max_by_key(Timeframe::sort_key)
    }

    fn validate_base_supported(&self) -> Result<()> {
        match self.base.unit() {
            TimeframeUnit::Minute => {
                if !UPBIT_MINUTE_UNITS.contains(&self.base.value()) {
                    return Err(ConfigError::UnsupportedMinuteBase {
                        label: self.base.label(),
                    });
                }
            }
            unit => {
                if self.base.value() != 1 {
                    return Err(ConfigError::UnsupportedCalendarBase {
                        unit,
                        label: self.base.label(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Walks the targets in ascending order, requiring each to have an
    /// aggregable predecessor among those already reachable.
    fn validate_hierarchy(&self) -> Result<()> {
        let mut available = vec![self.base];

        for target in &self.targets {
            if *target == self.base {
                continue;
            }

            if self.select_source(*target, &available).is_none() {
                return Err(ConfigError::NoAggregationPath {
                    target: target.label(),
                });
            }

            available.push(*target);
        }

        Ok(())
    }
}

/// Smallest base timeframe across the configured pairs; drives the cycle
/// schedule.
pub(crate) fn min_base_timeframe(pairs: &[SymbolTimeframeConfig]) -> Option<Timeframe> {
    pairs
        .iter()
        .map(SymbolTimeframeConfig::base)
        .min_by_key(Timeframe::sort_key)
}

#[derive(Debug, Deserialize)]
struct PairsFile {
    #[serde(default)]
    pairs: Vec<PairEntry>,
}

#[derive(Debug, Deserialize)]
struct PairEntry {
    symbol: String,
    base_timeframe: Timeframe,
    #[serde(default)]
    target_timeframes: Option<Vec<Timeframe>>,
}

/// Configuration for the ingestion engine.
///
/// [`from_env`] reads the `OHLCV_*` and `UPBIT_*` environment variables of
/// the deployment; individual fields can be overridden with the `with_*`
/// setters.
///
/// [`from_env`]: IngestConfig::from_env
#[derive(Clone, Debug)]
pub struct IngestConfig {
    config_path: PathBuf,
    default_targets: Vec<Timeframe>,
    collect_start: DateTime<Utc>,
    max_retry: u32,
    execution_offset: Duration,
    api_base_url: String,
    rest_timeout: Duration,
    shutdown_timeout: Duration,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let config_path = env::var("OHLCV_CONFIG_PATH")
            .unwrap_or_else(|_| "config/ohlcv_settings.yml".to_string())
            .into();

        let default_targets_raw = env::var("DEFAULT_TARGET_TIMEFRAMES")
            .unwrap_or_else(|_| "60m,240m,1d".to_string());
        let default_targets = parse_timeframe_list(&default_targets_raw)?;

        let collect_start_raw =
            env::var("OHLCV_COLLECT_START").map_err(|_| ConfigError::MissingEnv {
                name: "OHLCV_COLLECT_START",
                hint: "e.g. 2024-01-01T00:00:00",
            })?;
        let collect_start = parse_collect_start(&collect_start_raw)?;

        let max_retry = parse_env_u32("OHLCV_RETRY_LIMIT", 1)?;
        let offset_secs = parse_env_u32("OHLCV_EXECUTION_OFFSET_SECONDS", 3)?;

        let api_base_url = env::var("UPBIT_API_BASE_URL")
            .unwrap_or_else(|_| upbit_sdk::UPBIT_API_BASE_URL.to_string());

        Ok(Self {
            config_path,
            default_targets,
            collect_start,
            max_retry,
            execution_offset: Duration::from_secs(offset_secs as u64),
            api_base_url,
            rest_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(6),
        })
    }

    /// Reads and validates the pair configuration file.
    pub fn load_pairs(&self) -> Result<Vec<SymbolTimeframeConfig>> {
        let raw =
            std::fs::read_to_string(&self.config_path).map_err(|source| ConfigError::FileRead {
                path: self.config_path.clone(),
                source,
            })?;

        let file: PairsFile =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::FileParse {
                path: self.config_path.clone(),
                source,
            })?;

        if file.pairs.is_empty() {
            return Err(ConfigError::NoPairsConfigured);
        }

        file.pairs
            .into_iter()
            .map(|entry| {
                let targets = entry
                    .target_timeframes
                    .unwrap_or_else(|| self.default_targets.clone());

                SymbolTimeframeConfig::new(entry.symbol, entry.base_timeframe, targets)
            })
            .collect()
    }

    /// Returns the pair configuration file path.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the fallback targets for pairs that declare none.
    pub fn default_targets(&self) -> &[Timeframe] {
        &self.default_targets
    }

    /// Returns the inclusive start of the collected history window.
    pub fn collect_start(&self) -> DateTime<Utc> {
        self.collect_start
    }

    /// Returns the harvester's per-segment retry budget.
    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    /// Returns the delay slept after each cron fire before collecting.
    pub fn execution_offset(&self) -> Duration {
        self.execution_offset
    }

    /// Returns the exchange API base URL.
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Returns the timeout applied to exchange HTTP requests.
    pub fn rest_timeout(&self) -> Duration {
        self.rest_timeout
    }

    /// Returns the timeout for winding the ingest process down.
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Sets the pair configuration file path.
    ///
    /// Default: `config/ohlcv_settings.yml`
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Sets the fallback targets for pairs that declare none.
    ///
    /// Default: `60m,240m,1d`
    pub fn with_default_targets(mut self, targets: Vec<Timeframe>) -> Self {
        self.default_targets = targets;
        self
    }

    /// Sets the inclusive start of the collected history window.
    pub fn with_collect_start(mut self, collect_start: DateTime<Utc>) -> Self {
        self.collect_start = collect_start;
        self
    }

    /// Sets the harvester's per-segment retry budget.
    ///
    /// Default: `1`
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Sets the delay slept after each cron fire before collecting.
    ///
    /// Default: `3` seconds
    pub fn with_execution_offset(mut self, offset: Duration) -> Self {
        self.execution_offset = offset;
        self
    }

    /// Sets the exchange API base URL.
    ///
    /// Default: [`upbit_sdk::UPBIT_API_BASE_URL`]
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Sets the timeout applied to exchange HTTP requests.
    ///
    /// Default: `10` seconds
    pub fn with_rest_timeout(mut self, timeout: Duration) -> Self {
        self.rest_timeout = timeout;
        self
    }

    /// Sets the timeout for winding the ingest process down.
    ///
    /// Default: `6` seconds
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Parses `OHLCV_COLLECT_START`: RFC 3339, or a zone-less ISO timestamp or
/// date interpreted as Seoul wall-clock time.
fn parse_collect_start(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(time.with_timezone(&Utc));
    }

    if let Ok(local) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(kst_to_utc(local));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let local = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        return Ok(kst_to_utc(local));
    }

    Err(ConfigError::InvalidEnv {
        name: "OHLCV_COLLECT_START",
        value: raw.to_string(),
    })
}

fn parse_timeframe_list(raw: &str) -> Result<Vec<Timeframe>> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse().map_err(ConfigError::Timeframe))
        .collect()
}

fn parse_env_u32(name: &'static str, default: u32) -> Result<u32> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidEnv {
            name,
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Narrowed config handed to the spawned ingest process.
#[derive(Clone)]
pub(crate) struct IngestProcessConfig {
    collect_start: DateTime<Utc>,
    max_retry: u32,
    execution_offset: Duration,
}

impl IngestProcessConfig {
    pub fn new(collect_start: DateTime<Utc>, max_retry: u32, execution_offset: Duration) -> Self {
        Self {
            collect_start,
            max_retry,
            execution_offset,
        }
    }

    pub fn collect_start(&self) -> DateTime<Utc> {
        self.collect_start
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    pub fn execution_offset(&self) -> Duration {
        self.execution_offset
    }
}

impl From<&IngestConfig> for IngestProcessConfig {
    fn from(value: &IngestConfig) -> Self {
        Self::new(value.collect_start, value.max_retry, value.execution_offset)
    }
}
