//! Error types for portfolio analytics
//!
//! `PortfolioError` is the user-facing taxonomy for the whole workspace. The
//! data and LLM crates keep their own error enums and convert into it.

use thiserror::Error;

/// Result type alias for portfolio operations
pub type Result<T> = std::result::Result<T, PortfolioError>;

/// Errors surfaced to the user by every portfolio action
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// The database could not be reached or rejected the credentials
    #[error("Connection failed: {0}")]
    ConnectionFailure(String),

    /// A query was sent but failed or timed out
    #[error("Query failed: {0}")]
    QueryFailure(String),

    /// A lookup, fetch or reshape produced nothing usable
    #[error("No data: {0}")]
    EmptyResult(String),

    /// Too few observations for sample statistics
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData {
        required: usize,
        actual: usize,
    },

    /// Numeric inputs were inconsistent (shape mismatch, ambiguous pivot)
    #[error("Computation failed: {0}")]
    ComputationFailure(String),

    /// A chart could not be produced or written
    #[error("Visualization failed: {0}")]
    VisualizationFailure(String),

    /// The LLM agent could not be created or did not produce an answer
    #[error("Agent error: {0}")]
    AgentFailure(String),

    /// An action needs a database connection first
    #[error("Not connected to the database")]
    NotConnected,

    /// An action needs fetched portfolio data first
    #[error("No portfolio data loaded")]
    NoData,

    /// User input was rejected before any work was done
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PortfolioError {
    /// Whether the error leaves the session usable without reconnecting
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConnectionFailure(_) | Self::Config(_))
    }
}
