use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("No strategy named '{name}' is registered")]
    UnknownStrategy { name: String },

    #[error("Strategy requires a non-empty candle frame")]
    EmptyFrame,

    #[error("Strategy state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Strategy state is not valid JSON: {0}")]
    State(#[from] serde_json::Error),
}
