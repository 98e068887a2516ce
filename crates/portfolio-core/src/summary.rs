//! Summaries of a sampled point cloud
//!
//! These are what the agent tools hand back to the model and what the
//! terminal renderer prints under its charts.

use serde::Serialize;

use crate::sampler::SampledPortfolio;

/// A sampled portfolio with ticker-labelled weights
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelledPortfolio {
    pub weights: Vec<(String, f64)>,
    pub expected_return: f64,
    pub std_dev: f64,
    pub sharpe_ratio: Option<f64>,
}

impl LabelledPortfolio {
    fn new(point: &SampledPortfolio, tickers: &[String]) -> Self {
        Self {
            weights: tickers
                .iter()
                .cloned()
                .zip(point.weights.iter().copied())
                .collect(),
            expected_return: point.expected_return,
            std_dev: point.std_dev,
            sharpe_ratio: point.sharpe_ratio,
        }
    }
}

/// Notable portfolios of a frontier point cloud
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrontierSummary {
    pub portfolios: usize,
    pub undefined_sharpe: usize,
    pub max_sharpe: Option<LabelledPortfolio>,
    pub min_volatility: Option<LabelledPortfolio>,
    pub max_return: Option<LabelledPortfolio>,
}

impl FrontierSummary {
    pub fn from_points(points: &[SampledPortfolio], tickers: &[String]) -> Self {
        let label = |p: &SampledPortfolio| LabelledPortfolio::new(p, tickers);

        let max_sharpe = points
            .iter()
            .filter_map(|p| p.sharpe_ratio.map(|s| (s, p)))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, p)| label(p));
        let min_volatility = points
            .iter()
            .min_by(|a, b| a.std_dev.total_cmp(&b.std_dev))
            .map(label);
        let max_return = points
            .iter()
            .max_by(|a, b| a.expected_return.total_cmp(&b.expected_return))
            .map(label);

        Self {
            portfolios: points.len(),
            undefined_sharpe: points.iter().filter(|p| p.sharpe_ratio.is_none()).count(),
            max_sharpe,
            min_volatility,
            max_return,
        }
    }
}

/// Distribution of the defined Sharpe ratios of a point cloud
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharpeSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub median: f64,
    pub p95: f64,
}

impl SharpeSummary {
    /// `None` when no point has a defined Sharpe ratio
    pub fn from_points(points: &[SampledPortfolio]) -> Option<Self> {
        let mut sharpe: Vec<f64> = points.iter().filter_map(|p| p.sharpe_ratio).collect();
        if sharpe.is_empty() {
            return None;
        }
        sharpe.sort_by(f64::total_cmp);

        let count = sharpe.len();
        Some(Self {
            count,
            mean: sharpe.iter().sum::<f64>() / count as f64,
            min: sharpe[0],
            max: sharpe[count - 1],
            p05: quantile(&sharpe, 0.05),
            median: quantile(&sharpe, 0.5),
            p95: quantile(&sharpe, 0.95),
        })
    }
}

/// Linearly interpolated quantile of sorted, non-empty data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
