//! Tool trait

use async_trait::async_trait;
use portfolio_core::Result;
use portfolio_llm::ToolDefinition;
use serde_json::Value;

/// A function the model may call
///
/// Failures are not fatal to the agent: the executor reports them back to
/// the model as error results.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run with model-supplied arguments (should match `input_schema`)
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique within a registry
    fn name(&self) -> &str;

    /// Tells the model when the tool is useful
    fn description(&self) -> &str;

    /// JSON Schema for `params`
    fn input_schema(&self) -> Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.input_schema())
    }
}
