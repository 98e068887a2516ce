//! Error types for market data access

use std::time::Duration;

use portfolio_core::PortfolioError;
use thiserror::Error;

/// Result type alias for data operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised while talking to the market data source
#[derive(Debug, Error)]
pub enum DataError {
    /// Could not open a connection (network, TLS or authentication)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connecting took longer than the configured timeout
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// A query was rejected or failed mid-flight
    #[error("Query error: {0}")]
    Query(String),

    /// A query took longer than the configured timeout
    #[error("{operation} timed out after {timeout:?}")]
    QueryTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// A result row did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DataError> for PortfolioError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Connection(_) | DataError::ConnectTimeout(_) => {
                PortfolioError::ConnectionFailure(err.to_string())
            }
            DataError::Query(_) | DataError::QueryTimeout { .. } | DataError::Decode(_) => {
                PortfolioError::QueryFailure(err.to_string())
            }
            DataError::Config(msg) => PortfolioError::Config(msg),
        }
    }
}
