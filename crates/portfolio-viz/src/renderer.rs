//! Renderer capability

use portfolio_core::{PortfolioStatistics, Result, SampledPortfolio};

/// Something that can display the portfolio charts
///
/// Implementations report failures as `PortfolioError::VisualizationFailure`.
pub trait Renderer: Send + Sync {
    /// Risk/return scatter of a sampled point cloud
    fn render_frontier(&self, points: &[SampledPortfolio], tickers: &[String]) -> Result<()>;

    /// Histogram of the defined Sharpe ratios
    fn render_sharpe_distribution(&self, points: &[SampledPortfolio]) -> Result<()>;

    /// Mean return per ticker
    fn render_returns(&self, stats: &PortfolioStatistics) -> Result<()>;

    /// Where the output went, for user-facing messages
    fn describe(&self) -> String;
}
