//! Sharpe-ratio distribution tool

use std::sync::Arc;

use async_trait::async_trait;
use portfolio_core::{PortfolioError, Result, SharpeSummary};
use portfolio_llm::tools::schema;
use serde_json::{Value, json};

use crate::context::PortfolioContext;
use crate::tool::Tool;

/// Samples random portfolios and draws the histogram of their Sharpe ratios
pub struct PlotSharpeTool {
    context: Arc<PortfolioContext>,
}

impl PlotSharpeTool {
    pub fn new(context: Arc<PortfolioContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Tool for PlotSharpeTool {
    async fn execute(&self, _params: Value) -> Result<Value> {
        let ctx = &self.context;
        let points = ctx.sampler.sample(&ctx.stats)?;
        ctx.renderer.render_sharpe_distribution(&points)?;

        let summary = SharpeSummary::from_points(&points);
        let defined = summary.as_ref().map_or(0, |s| s.count);
        let summary = serde_json::to_value(&summary)
            .map_err(|e| PortfolioError::ComputationFailure(e.to_string()))?;

        Ok(json!({
            "status": format!("Sharpe ratio distribution plotted ({})", ctx.renderer.describe()),
            "portfolios": points.len(),
            "undefined_sharpe": points.len() - defined,
            "summary": summary,
        }))
    }

    fn name(&self) -> &str {
        "plot_sharpe_distribution"
    }

    fn description(&self) -> &str {
        "Plot the distribution of Sharpe ratios (daily return divided by daily standard \
         deviation, no risk-free rate) across randomly weighted portfolios of the loaded \
         tickers. Returns count, mean, min, max and 5th/50th/95th percentiles."
    }

    fn input_schema(&self) -> Value {
        schema::empty()
    }
}
