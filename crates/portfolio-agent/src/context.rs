//! Data shared by the agent's tools

use std::sync::Arc;

use portfolio_core::{FrontierSampler, PortfolioStatistics, ReturnMatrix};
use portfolio_viz::Renderer;

/// One fetch's worth of data plus the means to chart it
pub struct PortfolioContext {
    pub matrix: ReturnMatrix,
    pub stats: PortfolioStatistics,
    pub sampler: FrontierSampler,
    pub renderer: Arc<dyn Renderer>,
}

impl PortfolioContext {
    pub fn new(
        matrix: ReturnMatrix,
        stats: PortfolioStatistics,
        sampler: FrontierSampler,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            matrix,
            stats,
            sampler,
            renderer,
        }
    }
}

impl std::fmt::Debug for PortfolioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioContext")
            .field("tickers", &self.matrix.tickers())
            .field("rows", &self.matrix.n_rows())
            .field("sampler", &self.sampler)
            .field("renderer", &self.renderer.describe())
            .finish()
    }
}
