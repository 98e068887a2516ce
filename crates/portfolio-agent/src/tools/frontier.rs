//! Efficient-frontier plotting tool

use std::sync::Arc;

use async_trait::async_trait;
use portfolio_core::{FrontierSummary, PortfolioError, Result};
use portfolio_llm::tools::schema;
use serde_json::{Value, json};
use tracing::info;

use crate::context::PortfolioContext;
use crate::tool::Tool;

/// Samples random portfolios, draws the frontier, and reports the notable ones
pub struct PlotFrontierTool {
    context: Arc<PortfolioContext>,
}

impl PlotFrontierTool {
    pub fn new(context: Arc<PortfolioContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for PlotFrontierTool {
    async fn execute(&self, _params: Value) -> Result<Value> {
        let ctx = &self.context;
        let points = ctx.sampler.sample(&ctx.stats)?;
        ctx.renderer.render_frontier(&points, ctx.stats.tickers())?;

        let summary = FrontierSummary::from_points(&points, ctx.stats.tickers());
        info!(portfolios = summary.portfolios, "Frontier plotted for agent");

        let summary = serde_json::to_value(&summary)
            .map_err(|e| PortfolioError::ComputationFailure(e.to_string()))?;
        Ok(json!({
            "status": format!("Efficient frontier plotted ({})", ctx.renderer.describe()),
            "summary": summary,
        }))
    }

    fn name(&self) -> &str {
        "plot_efficient_frontier"
    }

    fn description(&self) -> &str {
        "Plot the efficient frontier of the loaded portfolio by sampling random long-only \
         weightings (risk on x, return on y, shaded by Sharpe ratio). Returns the number of \
         portfolios sampled and the max-Sharpe, min-volatility and max-return portfolios \
         with their weights. Returns and risk are per trading day."
    }

    fn input_schema(&self) -> Value {
        schema::empty()
    }
}
