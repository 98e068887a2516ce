//! Chart payloads as JSON files
//!
//! Each render overwrites one file in the output directory, so an external
//! plotting front end can watch the directory and redraw.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use portfolio_core::{
    FrontierSummary, PortfolioError, PortfolioStatistics, Result, SampledPortfolio, SharpeSummary,
};
use serde::Serialize;
use tracing::info;

use crate::histogram::{Bin, SHARPE_BINS, histogram};
use crate::renderer::Renderer;

pub const FRONTIER_FILE: &str = "efficient_frontier.json";
pub const SHARPE_FILE: &str = "sharpe_distribution.json";
pub const RETURNS_FILE: &str = "returns.json";

#[derive(Serialize)]
struct Axes {
    title: &'static str,
    x_label: &'static str,
    y_label: &'static str,
}

#[derive(Serialize)]
struct FrontierPoint<'a> {
    risk: f64,
    #[serde(rename = "return")]
    expected_return: f64,
    sharpe: Option<f64>,
    weights: &'a [f64],
}

#[derive(Serialize)]
struct FrontierChart<'a> {
    #[serde(flatten)]
    axes: Axes,
    color_label: &'static str,
    tickers: &'a [String],
    points: Vec<FrontierPoint<'a>>,
    summary: FrontierSummary,
}

#[derive(Serialize)]
struct SharpeChart {
    #[serde(flatten)]
    axes: Axes,
    bins: Vec<Bin>,
    summary: SharpeSummary,
    undefined: usize,
}

#[derive(Serialize)]
struct ReturnBar<'a> {
    ticker: &'a str,
    mean_return: f64,
    std_dev: f64,
}

#[derive(Serialize)]
struct ReturnsChart<'a> {
    #[serde(flatten)]
    axes: Axes,
    observations: usize,
    bars: Vec<ReturnBar<'a>>,
}

/// Writes chart payloads into a directory
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    dir: PathBuf,
}

impl JsonRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<T: Serialize>(&self, file: &str, payload: &T) -> Result<()> {
        let failure = |e: &dyn std::fmt::Display| {
            PortfolioError::VisualizationFailure(format!("{}: {e}", self.dir.join(file).display()))
        };

        fs::create_dir_all(&self.dir).map_err(|e| failure(&e))?;
        let path = self.dir.join(file);
        let writer = BufWriter::new(File::create(&path).map_err(|e| failure(&e))?);
        serde_json::to_writer_pretty(writer, payload).map_err(|e| failure(&e))?;

        info!(path = %path.display(), "Wrote chart payload");
        Ok(())
    }
}

impl Renderer for JsonRenderer {
    fn render_frontier(&self, points: &[SampledPortfolio], tickers: &[String]) -> Result<()> {
        if points.is_empty() {
            return Err(PortfolioError::VisualizationFailure(
                "no portfolios to plot".to_string(),
            ));
        }

        let chart = FrontierChart {
            axes: Axes {
                title: "Efficient Frontier",
                x_label: "Portfolio Risk (Standard Deviation)",
                y_label: "Portfolio Return",
            },
            color_label: "Sharpe Ratio",
            tickers,
            points: points
                .iter()
                .map(|p| FrontierPoint {
                    risk: p.std_dev,
                    expected_return: p.expected_return,
                    sharpe: p.sharpe_ratio,
                    weights: &p.weights,
                })
                .collect(),
            summary: FrontierSummary::from_points(points, tickers),
        };
        self.write(FRONTIER_FILE, &chart)
    }

    fn render_sharpe_distribution(&self, points: &[SampledPortfolio]) -> Result<()> {
        let Some(summary) = SharpeSummary::from_points(points) else {
            return Err(PortfolioError::VisualizationFailure(
                "no portfolio has a defined Sharpe ratio".to_string(),
            ));
        };
        let sharpe: Vec<f64> = points.iter().filter_map(|p| p.sharpe_ratio).collect();

        let chart = SharpeChart {
            axes: Axes {
                title: "Sharpe Ratio Distribution",
                x_label: "Sharpe Ratio",
                y_label: "Frequency",
            },
            bins: histogram(&sharpe, SHARPE_BINS),
            undefined: points.len() - summary.count,
            summary,
        };
        self.write(SHARPE_FILE, &chart)
    }

    fn render_returns(&self, stats: &PortfolioStatistics) -> Result<()> {
        let std_devs = stats.std_devs();
        let chart = ReturnsChart {
            axes: Axes {
                title: "Portfolio Returns by Stock",
                x_label: "Stock",
                y_label: "Mean Return",
            },
            observations: stats.observations(),
            bars: stats
                .tickers()
                .iter()
                .zip(stats.expected_returns().iter())
                .zip(std_devs)
                .map(|((ticker, mean), std_dev)| ReturnBar {
                    ticker,
                    mean_return: *mean,
                    std_dev,
                })
                .collect(),
        };
        self.write(RETURNS_FILE, &chart)
    }

    fn describe(&self) -> String {
        format!("JSON files in {}", self.dir.display())
    }
}
