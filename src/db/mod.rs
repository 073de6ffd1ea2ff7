use std::{str::FromStr, sync::Arc, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

pub(crate) mod error;
pub(crate) mod models;
pub(crate) mod repositories;
mod sqlite;

use error::{DbError, Result};
use repositories::{CandlesRepository, RangesRepository};
use sqlite::{candles::SqliteCandlesRepo, ranges::SqliteRangesRepo};

/// Handle to the local candle store.
///
/// The store is a single-writer resource: the ingest process is the only
/// writer, and readers get snapshot views through SQLite's WAL mode.
pub struct Database {
    pub(crate) candles: Box<dyn CandlesRepository>,
    pub(crate) ranges: Box<dyn RangesRepository>,
    pub pool: SqlitePool,
}

impl Database {
    /// Opens (creating if missing) the store at `db_url` and applies
    /// pending migrations.
    pub async fn connect(db_url: &str) -> Result<Arc<Self>> {
        let options = SqliteConnectOptions::from_str(db_url)
            .map_err(DbError::Connection)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(DbError::Connection)?;

        info!(db_url, "connected to candle store");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::Migration)?;

        let check: i64 = sqlx::query_scalar("SELECT 150")
            .fetch_one(&pool)
            .await
            .map_err(DbError::Query)?;

        if check != 150 {
            return Err(DbError::UnexpectedQueryResult(format!(
                "store check returned {check}"
            )));
        }

        let candles = Box::new(SqliteCandlesRepo::new(pool.clone()));
        let ranges = Box::new(SqliteRangesRepo::new(pool.clone()));

        Ok(Arc::new(Self {
            candles,
            ranges,
            pool,
        }))
    }
}
