//! Configuration error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("invalid duration: {input}")]
    InvalidDuration { input: String },

    #[error("no target urls given")]
    NoTargets,

    #[error("add --i-understand to confirm you have permission to test against the provided urls")]
    NotConfirmed,
}
