use std::result;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RestApiError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),

    #[error("Invalid request URL '{url}': {reason}")]
    UrlParse { url: String, reason: String },

    #[error("Request send failed: {0}")]
    SendFailed(reqwest::Error),

    #[error("Error response. Status: {status}. Body: {text}")]
    ErrorResponse { status: StatusCode, text: String },

    #[error("Response decoding error: {0}")]
    ResponseDecoding(reqwest::Error),

    #[error("Failed to deserialize response JSON: {e}. Raw response: {raw_response}")]
    ResponseJsonDeserializeFailed {
        raw_response: String,
        e: serde_json::Error,
    },
}

pub type Result<T> = result::Result<T, RestApiError>;
