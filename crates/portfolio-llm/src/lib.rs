//! Chat-completion layer for portfolio-rs
//!
//! Provider-agnostic request/response types with tool calling, the
//! [`LLMProvider`] capability, and an OpenAI-compatible implementation in
//! [`providers`].

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod tools;

pub use completion::{CompletionRequest, CompletionRequestBuilder, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{Message, Role, ToolCall};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;
