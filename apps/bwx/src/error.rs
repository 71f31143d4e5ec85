//! CLI error handling

use std::fmt;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(bwx_errors::ConfigError),
    /// Engine or sink error
    Run(bwx_errors::Error),
    /// I/O error
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Run(e) => write!(f, "{e}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Run(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<bwx_errors::ConfigError> for CliError {
    fn from(e: bwx_errors::ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<bwx_errors::Error> for CliError {
    fn from(e: bwx_errors::Error) -> Self {
        match e {
            bwx_errors::Error::Config(e) => CliError::Config(e),
            other => CliError::Run(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
