//! Error types for LLM calls

use portfolio_core::PortfolioError;
use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors from a chat-completion provider
#[derive(Error, Debug)]
pub enum LLMError {
    /// The provider rejected the API key
    #[error("Authentication with the model provider failed")]
    AuthenticationFailed,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Non-success status without a more specific mapping
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The response parsed but did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<LLMError> for PortfolioError {
    fn from(err: LLMError) -> Self {
        PortfolioError::AgentFailure(err.to_string())
    }
}
