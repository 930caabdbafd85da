//! Error types for the oracle client

use thiserror::Error;

/// Errors raised by a single oracle request.
#[derive(Error, Debug)]
pub enum OracleError {
    /// Transport failure, timeout, or non-success status
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body was not the expected JSON object
    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),

    /// Client could not be configured
    #[error("Invalid oracle configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        OracleError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::MalformedResponse(err.to_string())
    }
}

pub type OracleResult<T> = std::result::Result<T, OracleError>;
