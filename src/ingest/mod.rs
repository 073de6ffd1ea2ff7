mod config;
mod engine;
pub(crate) mod error;
pub(crate) mod process;
mod schedule;
mod source;
mod state;

pub use config::{IngestConfig, SymbolTimeframeConfig};
pub use engine::{IngestController, IngestEngine};
pub use state::{IngestReader, IngestStatus};
