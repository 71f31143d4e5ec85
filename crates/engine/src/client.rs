//! HTTP client construction for the transfer engines

use bwx_config::Config;
use bwx_errors::{Error, NetworkError};
use reqwest::Client;

/// Build the client used by download workers.
///
/// Each invocation gets its own client; workers share its connection pool
/// but hold no other mutable state in common.
///
/// # Errors
///
/// Returns an error if the underlying reqwest client fails to initialize.
pub fn build_download_client(config: &Config) -> Result<Client, Error> {
    Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .user_agent(user_agent())
        .build()
        .map_err(|e| NetworkError::ConnectionRefused(e.to_string()).into())
}

/// Build the client used by upload workers.
///
/// Upload request bodies are effectively unbounded, so there is no total
/// request timeout; only the connect timeout applies.
///
/// # Errors
///
/// Returns an error if the underlying reqwest client fails to initialize.
pub fn build_upload_client(config: &Config) -> Result<Client, Error> {
    Client::builder()
        .connect_timeout(config.connect_timeout())
        .user_agent(user_agent())
        .build()
        .map_err(|e| NetworkError::ConnectionRefused(e.to_string()).into())
}

fn user_agent() -> String {
    format!("bwx/{}", env!("CARGO_PKG_VERSION"))
}
