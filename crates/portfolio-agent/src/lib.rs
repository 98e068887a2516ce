//! Portfolio question-answering agent
//!
//! The agent is an LLM loop over a small tool registry. The model sees the
//! fetched return matrix and statistics in its system prompt and can call:
//!
//! - `plot_efficient_frontier`: sample random portfolios, draw the frontier
//! - `plot_sharpe_distribution`: sample random portfolios, draw the Sharpe histogram
//! - `return_table`: inspect the return matrix (summary, rows, correlations)
//!
//! Callers depend on [`QuestionAnswerer`], not on the agent type, so the
//! interactive session can be tested without a model.

pub mod agent;
pub mod context;
pub mod executor;
pub mod observer;
pub mod prompts;
pub mod registry;
pub mod tool;
pub mod tools;

pub use agent::{PortfolioAgent, QuestionAnswerer};
pub use context::PortfolioContext;
pub use executor::{AgentExecutor, ExecutorConfig};
pub use observer::{AgentObserver, NoopObserver};
pub use registry::ToolRegistry;
pub use tool::Tool;
