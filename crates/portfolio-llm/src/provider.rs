//! LLM provider capability

use async_trait::async_trait;

use crate::{CompletionRequest, CompletionResponse, Result};

/// A chat-completion backend
///
/// The agent only talks to this trait, so tests can substitute a scripted
/// provider for the network one.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short provider name for logs (e.g. "openai")
    fn name(&self) -> &'static str;
}
