//! OpenAI-compatible chat-completions provider
//!
//! Works against api.openai.com and any server exposing the same
//! `/chat/completions` endpoint (Azure deployments, vLLM, LM Studio).
//!
//! ```no_run
//! use portfolio_llm::providers::{OpenAIConfig, OpenAIProvider};
//! use portfolio_llm::{CompletionRequest, LLMProvider, Message};
//!
//! # async fn run() -> portfolio_llm::Result<()> {
//! let provider = OpenAIProvider::with_config(OpenAIConfig::from_env()?)?;
//! let request = CompletionRequest::builder("gpt-4o-mini")
//!     .add_message(Message::user("Hello"))
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{:?}", response.message.content_text());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, Role,
    StopReason, TokenUsage, ToolCall, ToolDefinition,
};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection settings for an OpenAI-compatible endpoint
#[derive(Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    /// Base URL without the `/chat/completions` suffix
    pub api_base: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Read `OPENAI_API_KEY` and, if set, `OPENAI_API_BASE`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LLMError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
            })?;

        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            config = config.with_api_base(base);
        }
        Ok(config)
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LLMError::Configuration("API key cannot be empty".to_string()));
        }
        if self.api_base.is_empty() {
            return Err(LLMError::Configuration("API base URL cannot be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(LLMError::Configuration(
                "timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

/// Chat-completions client
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(OpenAIConfig::new(api_key))
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone();
        let body = WireRequest {
            model: request.model,
            messages: to_wire_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: to_wire_tools(&request.tools),
        };

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            warn!(status = status.as_u16(), "Completion request rejected");
            return Err(match status.as_u16() {
                400 => LLMError::InvalidRequest(text),
                401 | 403 => LLMError::AuthenticationFailed,
                404 => LLMError::ModelNotFound(model),
                429 => LLMError::RateLimitExceeded(text),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {text}")),
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("failed to parse response: {e}")))?;
        let usage = wire.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });
        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("response has no choices".to_string()))?;

        let finish_reason = choice.finish_reason.unwrap_or_default();
        debug!(
            finish_reason = %finish_reason,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Completion received"
        );

        Ok(CompletionResponse {
            message: from_wire_message(choice.message)?,
            stop_reason: map_finish_reason(&finish_reason),
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// Wire format

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

fn function_type() -> String {
    "function".to_string()
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

/// System prompt first, then the conversation
fn to_wire_messages(system: Option<String>, messages: Vec<Message>) -> Vec<WireMessage> {
    system
        .map(Message::system)
        .into_iter()
        .chain(messages)
        .map(to_wire_message)
        .collect()
}

fn to_wire_message(msg: Message) -> WireMessage {
    let content = match (msg.is_error, msg.content) {
        (true, Some(text)) => Some(format!("Error: {text}")),
        (_, content) => content,
    };
    let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
        msg.tool_calls
            .into_iter()
            .map(|call| WireToolCall {
                id: call.id,
                kind: function_type(),
                function: WireFunctionCall {
                    name: call.name,
                    arguments: call.arguments.to_string(),
                },
            })
            .collect()
    });

    WireMessage {
        role: role_name(msg.role).to_string(),
        content,
        tool_calls,
        tool_call_id: msg.tool_call_id,
    }
}

fn to_wire_tools(tools: &[ToolDefinition]) -> Vec<WireTool> {
    tools
        .iter()
        .map(|tool| WireTool {
            kind: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

fn from_wire_message(msg: WireMessage) -> Result<Message> {
    let tool_calls = msg
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| -> Result<ToolCall> {
            // Some servers send an empty string for argument-less calls
            let arguments = if call.function.arguments.trim().is_empty() {
                serde_json::Value::Object(serde_json::Map::new())
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|e| {
                    LLMError::UnexpectedResponse(format!(
                        "invalid arguments for tool '{}': {e}",
                        call.function.name
                    ))
                })?
            };
            Ok(ToolCall::new(call.id, call.function.name, arguments))
        })
        .collect::<Result<Vec<_>>>()?;

    let content = msg.content.filter(|c| !c.is_empty());
    Ok(Message::assistant_tool_calls(content, tool_calls))
}

fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "length" => StopReason::MaxTokens,
        "content_filter" => StopReason::ContentFilter,
        "stop" => StopReason::EndTurn,
        other => {
            debug!(reason = other, "Unknown finish reason");
            StopReason::EndTurn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("sk-test").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.config().api_base, "https://api.openai.com/v1");
        assert_eq!(provider.config().timeout_secs, 120);
    }

    #[test]
    fn test_config_builder() {
        let config = OpenAIConfig::new("sk-test")
            .with_api_base("http://localhost:1234/v1/")
            .with_timeout(30);
        assert_eq!(config.completions_url(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(config.timeout_secs, 30);
        assert!(!format!("{config:?}").contains("sk-test"));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            OpenAIProvider::new("  "),
            Err(LLMError::Configuration(_))
        ));
    }

    #[test]
    fn test_system_prompt_goes_first() {
        let wire = to_wire_messages(Some("context".into()), vec![Message::user("question")]);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[0].content.as_deref(), Some("context"));
        assert_eq!(wire[1].role, "user");
    }

    #[test]
    fn test_tool_round_trip_messages() {
        let assistant = Message::assistant_tool_calls(
            None,
            vec![ToolCall::new("call_9", "return_table", json!({"view": "describe"}))],
        );
        let wire = to_wire_message(assistant);
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].kind, "function");
        assert_eq!(calls[0].function.arguments, r#"{"view":"describe"}"#);

        let error = to_wire_message(Message::tool_error("call_9", "bad view"));
        assert_eq!(error.role, "tool");
        assert_eq!(error.tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(error.content.as_deref(), Some("Error: bad view"));
    }

    #[test]
    fn test_tool_definitions() {
        let tools = to_wire_tools(&[ToolDefinition::new(
            "plot_sharpe_distribution",
            "Histogram of Sharpe ratios",
            json!({"type": "object", "properties": {}}),
        )]);
        let json = serde_json::to_value(&tools).unwrap();
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["name"], "plot_sharpe_distribution");
    }

    #[test]
    fn test_parse_response() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "a", "type": "function", "function": {"name": "plot_efficient_frontier", "arguments": ""}},
                        {"id": "b", "type": "function", "function": {"name": "return_table", "arguments": "{\"view\":\"rows\",\"limit\":5}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4}
        });
        let wire: WireResponse = serde_json::from_value(raw).unwrap();
        let choice = wire.choices.into_iter().next().unwrap();
        let message = from_wire_message(choice.message).unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, None);
        assert_eq!(message.tool_calls.len(), 2);
        assert_eq!(message.tool_calls[0].arguments, json!({}));
        assert_eq!(message.tool_calls[1].arguments["limit"], 5);
    }

    #[test]
    fn test_invalid_tool_arguments() {
        let msg = WireMessage {
            role: "assistant".into(),
            content: None,
            tool_calls: Some(vec![WireToolCall {
                id: "a".into(),
                kind: function_type(),
                function: WireFunctionCall {
                    name: "return_table".into(),
                    arguments: "{not json".into(),
                },
            }]),
            tool_call_id: None,
        };
        assert!(matches!(
            from_wire_message(msg),
            Err(LLMError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_finish_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_finish_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_finish_reason("content_filter"), StopReason::ContentFilter);
        assert_eq!(map_finish_reason(""), StopReason::EndTurn);
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY and network access
    async fn test_live_completion() {
        let _ = dotenvy::dotenv();
        let Ok(config) = OpenAIConfig::from_env() else {
            return;
        };
        let provider = OpenAIProvider::with_config(config).unwrap();
        let request = CompletionRequest::builder("gpt-4o-mini")
            .add_message(Message::user("Reply with the single word: ready"))
            .max_tokens(10)
            .build();
        let response = provider.complete(request).await.unwrap();
        assert!(response.message.content_text().is_some());
    }
}
