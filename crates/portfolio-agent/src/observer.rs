//! Progress callbacks for a running agent

use async_trait::async_trait;
use serde_json::Value;

/// Receives agent progress, e.g. to print a "thinking" log
///
/// Every method has a no-op default.
#[async_trait]
pub trait AgentObserver: Send + Sync {
    /// A question was accepted
    async fn on_question(&self, _question: &str) {}

    /// Text the model produced alongside tool calls
    async fn on_thought(&self, _text: &str) {}

    async fn on_tool_start(&self, _name: &str, _input: &Value) {}

    /// `output` is the tool result or the error message
    async fn on_tool_done(&self, _name: &str, _output: Result<&Value, &str>, _duration_ms: u64) {}

    async fn on_complete(&self, _answer: &str) {}

    async fn on_error(&self, _error: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl AgentObserver for NoopObserver {}
