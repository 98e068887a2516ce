//! Portfolio agent and the question-answering capability

use std::sync::Arc;

use async_trait::async_trait;
use portfolio_core::{PortfolioError, Result};
use portfolio_llm::LLMProvider;
use tracing::{info, instrument};

use crate::context::PortfolioContext;
use crate::executor::{AgentExecutor, ExecutorConfig};
use crate::observer::AgentObserver;
use crate::prompts;
use crate::registry::ToolRegistry;
use crate::tools::{PlotFrontierTool, PlotSharpeTool, ReturnTableTool};

/// Answers free-form questions about the loaded portfolio
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

/// LLM agent bound to one fetch's data
///
/// The system prompt is rendered once at construction; each question starts
/// a fresh conversation.
pub struct PortfolioAgent {
    executor: AgentExecutor,
    system_prompt: String,
}

impl PortfolioAgent {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        context: PortfolioContext,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let system_prompt = prompts::system_prompt(&context)?;
        let context = Arc::new(context);
        let registry = ToolRegistry::new()
            .with_tool(Arc::new(PlotFrontierTool::new(context.clone())))
            .with_tool(Arc::new(PlotSharpeTool::new(context.clone())))
            .with_tool(Arc::new(ReturnTableTool::new(context)));

        let executor = AgentExecutor::new(provider, registry, config)?;
        info!(
            model = %executor.config().model,
            tools = ?executor.registry().names(),
            "Portfolio agent ready"
        );
        Ok(Self {
            executor,
            system_prompt,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn AgentObserver>) -> Self {
        self.executor = self.executor.with_observer(observer);
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.executor.registry().names()
    }
}

#[async_trait]
impl QuestionAnswerer for PortfolioAgent {
    #[instrument(skip(self))]
    async fn answer(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PortfolioError::InvalidInput("question is empty".to_string()));
        }
        self.executor.run(&self.system_prompt, question).await
    }
}
