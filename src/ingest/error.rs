use thiserror::Error;

use crate::db::error::DbError;

/// Errors surfaced to external consumers of the read surface.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum IngestError {
    /// The initial collection cycle has not completed yet.
    #[error("Ingest service unavailable: initial collection has not completed")]
    ServiceUnavailable,

    /// The ingest engine has shut down.
    #[error("Ingest service stopped")]
    ServiceStopped,

    #[error(transparent)]
    Db(#[from] DbError),
}
