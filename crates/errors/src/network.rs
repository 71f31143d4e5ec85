//! Network-related error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("server error: {0}")]
    ServerError(String),
}
