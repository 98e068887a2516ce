//! Text rendering for interactive terminals

use std::io::{self, Write};
use std::sync::Mutex;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use portfolio_core::{
    FrontierSummary, LabelledPortfolio, PortfolioError, PortfolioStatistics, Result,
    SampledPortfolio, SharpeSummary,
};
use tracing::debug;

use crate::histogram::{SHARPE_BINS, histogram};
use crate::renderer::Renderer;

/// Glyphs for Sharpe quintiles, lowest first
const SHARPE_GLYPHS: [char; 5] = ['.', ':', '+', '*', '#'];
/// Glyph for points without a Sharpe ratio
const UNDEFINED_GLYPH: char = 'o';

const DEFAULT_WIDTH: usize = 64;
const DEFAULT_HEIGHT: usize = 20;
const BAR_WIDTH: usize = 40;

/// Draws charts as text into any writer
pub struct TerminalRenderer<W: Write + Send> {
    out: Mutex<W>,
    width: usize,
    height: usize,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    /// Plot area size in characters
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width.max(2);
        self.height = height.max(2);
        self
    }

    /// Recover the writer (used by tests to inspect output)
    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|_| PortfolioError::VisualizationFailure("output lock poisoned".to_string()))
    }

    fn emit(&self, text: &str) -> Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| PortfolioError::VisualizationFailure("output lock poisoned".to_string()))?;
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| PortfolioError::VisualizationFailure(e.to_string()))
    }

    fn scatter(&self, points: &[SampledPortfolio]) -> Vec<String> {
        let (x_min, x_max) = bounds(points.iter().map(|p| p.std_dev));
        let (y_min, y_max) = bounds(points.iter().map(|p| p.expected_return));
        let x_span = if x_max > x_min { x_max - x_min } else { 1.0 };
        let y_span = if y_max > y_min { y_max - y_min } else { 1.0 };

        let mut sharpe: Vec<f64> = points.iter().filter_map(|p| p.sharpe_ratio).collect();
        sharpe.sort_by(f64::total_cmp);
        let cuts: Vec<f64> = (1..SHARPE_GLYPHS.len())
            .filter_map(|q| sharpe.get(q * sharpe.len() / SHARPE_GLYPHS.len()).copied())
            .collect();

        // Cell rank: 0 = undefined Sharpe, 1..=5 = quintile; higher wins
        let mut grid = vec![vec![None::<usize>; self.width]; self.height];
        for p in points {
            let col = ((p.std_dev - x_min) / x_span * (self.width - 1) as f64).round() as usize;
            let row = ((p.expected_return - y_min) / y_span * (self.height - 1) as f64).round() as usize;
            let rank = p
                .sharpe_ratio
                .map_or(0, |s| 1 + cuts.iter().filter(|c| s >= **c).count());
            let cell = &mut grid[self.height - 1 - row.min(self.height - 1)][col.min(self.width - 1)];
            *cell = Some(cell.map_or(rank, |r| r.max(rank)));
        }

        let top = format!("{y_max:.5}");
        let bottom = format!("{y_min:.5}");
        let label_width = top.len().max(bottom.len());

        let mut lines = Vec::with_capacity(self.height + 3);
        for (i, row) in grid.iter().enumerate() {
            let label = match i {
                0 => top.as_str(),
                i if i == self.height - 1 => bottom.as_str(),
                _ => "",
            };
            let body: String = row
                .iter()
                .map(|cell| match cell {
                    None => ' ',
                    Some(0) => UNDEFINED_GLYPH,
                    Some(rank) => SHARPE_GLYPHS[rank - 1],
                })
                .collect();
            lines.push(format!("{label:>label_width$} |{}", body.trim_end()));
        }
        lines.push(format!("{:>label_width$} +{}", "", "-".repeat(self.width)));
        let left = format!("{x_min:.5}");
        let right = format!("{x_max:.5}");
        let gap = self.width.saturating_sub(left.len() + right.len());
        lines.push(format!("{:>label_width$}  {left}{}{right}", "", " ".repeat(gap)));
        lines
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn render_frontier(&self, points: &[SampledPortfolio], tickers: &[String]) -> Result<()> {
        if points.is_empty() {
            return Err(PortfolioError::VisualizationFailure(
                "no portfolios to plot".to_string(),
            ));
        }

        let mut text = format!("\nEfficient Frontier ({} portfolios)\n", points.len());
        text.push_str("return\n");
        for line in self.scatter(points) {
            text.push_str(&line);
            text.push('\n');
        }
        text.push_str(&format!(
            "{:>w$}risk (standard deviation)\n",
            "",
            w = self.width / 2
        ));
        text.push_str(&format!(
            "Sharpe quintile, low to high: {}   undefined: {UNDEFINED_GLYPH}\n\n",
            SHARPE_GLYPHS
                .iter()
                .map(char::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        ));

        let summary = FrontierSummary::from_points(points, tickers);
        text.push_str(&frontier_table(&summary).to_string());
        text.push('\n');

        debug!(points = points.len(), "Rendered frontier to terminal");
        self.emit(&text)
    }

    fn render_sharpe_distribution(&self, points: &[SampledPortfolio]) -> Result<()> {
        let sharpe: Vec<f64> = points.iter().filter_map(|p| p.sharpe_ratio).collect();
        let Some(summary) = SharpeSummary::from_points(points) else {
            return Err(PortfolioError::VisualizationFailure(
                "no portfolio has a defined Sharpe ratio".to_string(),
            ));
        };

        let bins = histogram(&sharpe, SHARPE_BINS);
        let peak = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);

        let mut text = format!("\nSharpe Ratio Distribution ({} portfolios)\n", summary.count);
        for bin in &bins {
            let len = bin.count * BAR_WIDTH / peak;
            text.push_str(&format!(
                "{:>9.4} {:<w$} {}\n",
                bin.lower,
                "#".repeat(len),
                bin.count,
                w = BAR_WIDTH
            ));
        }
        text.push_str(&format!(
            "\nmean {:.4}  min {:.4}  p5 {:.4}  median {:.4}  p95 {:.4}  max {:.4}\n",
            summary.mean, summary.min, summary.p05, summary.median, summary.p95, summary.max
        ));
        let undefined = points.len() - summary.count;
        if undefined > 0 {
            text.push_str(&format!("{undefined} portfolios with zero volatility excluded\n"));
        }

        self.emit(&text)
    }

    fn render_returns(&self, stats: &PortfolioStatistics) -> Result<()> {
        let means = stats.expected_returns();
        let largest = means.iter().fold(0.0_f64, |acc, m| acc.max(m.abs()));
        let std_devs = stats.std_devs();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Ticker", "Mean return", "Std dev", ""]);
        for (i, ticker) in stats.tickers().iter().enumerate() {
            let mean = means[i];
            let len = if largest > 0.0 {
                (mean.abs() / largest * (BAR_WIDTH / 2) as f64).round() as usize
            } else {
                0
            };
            let bar = if mean < 0.0 { "-" } else { "#" }.repeat(len);
            table.add_row(vec![
                Cell::new(ticker),
                Cell::new(format!("{mean:.6}")).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.6}", std_devs[i])).set_alignment(CellAlignment::Right),
                Cell::new(bar),
            ]);
        }

        let text = format!(
            "\nMean Return by Ticker ({} observations)\n{table}\n",
            stats.observations()
        );
        self.emit(&text)
    }

    fn describe(&self) -> String {
        "terminal".to_string()
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn frontier_table(summary: &FrontierSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Portfolio", "Return", "Risk", "Sharpe", "Weights"]);

    let rows = [
        ("Max Sharpe", &summary.max_sharpe),
        ("Min volatility", &summary.min_volatility),
        ("Max return", &summary.max_return),
    ];
    for (label, portfolio) in rows {
        if let Some(p) = portfolio {
            table.add_row(portfolio_row(label, p));
        }
    }
    table
}

fn portfolio_row(label: &str, p: &LabelledPortfolio) -> Vec<Cell> {
    let weights = p
        .weights
        .iter()
        .map(|(ticker, w)| format!("{ticker} {:.1}%", w * 100.0))
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        Cell::new(label),
        Cell::new(format!("{:.6}", p.expected_return)).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.6}", p.std_dev)).set_alignment(CellAlignment::Right),
        Cell::new(p.sharpe_ratio.map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}")))
            .set_alignment(CellAlignment::Right),
        Cell::new(weights),
    ]
}
