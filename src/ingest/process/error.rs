use std::result;

use thiserror::Error;

use crate::{db::error::DbError, shared::error::ConfigError};

use super::harvest_task::error::HarvestError;

/// Failure of one symbol's collection step. Recovered by the cycle loop:
/// the symbol is skipped and retried on the next cycle.
#[derive(Error, Debug)]
pub enum IngestCycleError {
    #[error("[Config] {0}")]
    Config(#[from] ConfigError),

    #[error("[Db] {0}")]
    Db(#[from] DbError),

    #[error("[Harvest] {0}")]
    Harvest(#[from] HarvestError),
}

pub(super) type Result<T> = result::Result<T, IngestCycleError>;
