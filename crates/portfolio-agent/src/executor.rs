//! Agent loop: model → tool calls → tool results → model, until an answer

use std::sync::Arc;
use std::time::Instant;

use portfolio_core::{PortfolioError, Result};
use portfolio_llm::{CompletionRequest, LLMProvider, Message, StopReason, ToolCall};
use tracing::{debug, info, instrument, warn};

use crate::observer::{AgentObserver, NoopObserver};
use crate::registry::ToolRegistry;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_ITERATIONS: usize = 8;
const DEFAULT_MAX_TOKENS: usize = 2048;
const PREVIEW_CHARS: usize = 300;

/// Settings for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    pub model: String,
    /// Upper bound on model calls per question
    pub max_iterations: usize,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(0.0),
        }
    }
}

impl ExecutorConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(PortfolioError::Config("model cannot be empty".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(PortfolioError::Config(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(PortfolioError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs the tool-calling loop against one provider and registry
pub struct AgentExecutor {
    provider: Arc<dyn LLMProvider>,
    registry: ToolRegistry,
    config: ExecutorConfig,
    observer: Arc<dyn AgentObserver>,
}

impl AgentExecutor {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        registry: ToolRegistry,
        config: ExecutorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            provider,
            registry,
            config,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer one question from scratch
    #[instrument(skip_all, fields(model = %self.config.model, provider = self.provider.name()))]
    pub async fn run(&self, system_prompt: &str, question: &str) -> Result<String> {
        self.observer.on_question(question).await;
        let result = self.run_loop(system_prompt, question).await;
        match &result {
            Ok(answer) => self.observer.on_complete(answer).await,
            Err(e) => self.observer.on_error(&e.to_string()).await,
        }
        result
    }

    async fn run_loop(&self, system_prompt: &str, question: &str) -> Result<String> {
        let mut conversation = vec![Message::user(question)];
        let tools = self.registry.definitions();

        for iteration in 1..=self.config.max_iterations {
            let mut builder = CompletionRequest::builder(&self.config.model)
                .system(system_prompt)
                .messages(conversation.clone())
                .max_tokens(self.config.max_tokens)
                .tools(tools.clone());
            if let Some(temperature) = self.config.temperature {
                builder = builder.temperature(temperature);
            }

            info!(iteration, "Calling model");
            let response = self.provider.complete(builder.build()).await?;
            info!(
                iteration,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model responded"
            );

            let message = response.message;
            if message.has_tool_calls() {
                if let Some(text) = message.content_text() {
                    self.observer.on_thought(text).await;
                }
                let calls = message.tool_calls.clone();
                conversation.push(message);
                for call in &calls {
                    conversation.push(self.execute_tool(call).await);
                }
                continue;
            }

            let text = message.content_text().map(str::trim).unwrap_or_default();
            return match response.stop_reason {
                StopReason::ContentFilter => Err(PortfolioError::AgentFailure(
                    "the model provider withheld the answer".to_string(),
                )),
                _ if text.is_empty() => Err(PortfolioError::AgentFailure(
                    "the model returned an empty answer".to_string(),
                )),
                StopReason::MaxTokens => {
                    warn!("Answer truncated at the token limit");
                    Ok(format!("{text}\n\n[answer truncated]"))
                }
                StopReason::EndTurn | StopReason::ToolUse => Ok(text.to_string()),
            };
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Agent stopped without an answer"
        );
        Err(PortfolioError::AgentFailure(format!(
            "no answer after {} model calls",
            self.config.max_iterations
        )))
    }

    /// Run one tool call; failures become error results for the model
    async fn execute_tool(&self, call: &ToolCall) -> Message {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            let error = format!(
                "unknown tool '{}'; available tools: {}",
                call.name,
                self.registry.names().join(", ")
            );
            self.observer.on_tool_done(&call.name, Err(&error), 0).await;
            return Message::tool_error(&call.id, error);
        };

        self.observer.on_tool_start(&call.name, &call.arguments).await;
        let started = Instant::now();
        let result = tool.execute(call.arguments.clone()).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(output) => {
                let text = output.to_string();
                debug!(
                    tool = %call.name,
                    duration_ms,
                    preview = %text.chars().take(PREVIEW_CHARS).collect::<String>(),
                    "Tool succeeded"
                );
                self.observer.on_tool_done(&call.name, Ok(&output), duration_ms).await;
                Message::tool_result(&call.id, text)
            }
            Err(e) => {
                let error = e.to_string();
                warn!(tool = %call.name, duration_ms, error = %error, "Tool failed");
                self.observer.on_tool_done(&call.name, Err(&error), duration_ms).await;
                Message::tool_error(&call.id, error)
            }
        }
    }
}
