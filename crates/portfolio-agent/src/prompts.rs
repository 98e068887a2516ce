//! System prompt for the portfolio agent

use minijinja::{Environment, context};
use portfolio_core::{PortfolioError, Result, ReturnMatrix};

use crate::context::PortfolioContext;

/// Rows shown from each end of a long return matrix
const PREVIEW_ROWS: usize = 5;

const SYSTEM_TEMPLATE: &str = r"You are a portfolio research assistant. You answer questions about a set of US stocks using daily return data from CRSP.

Data loaded: {{ tickers | join(', ') }} from {{ first_date }} to {{ last_date }} ({{ rows }} trading days with a return for every ticker).
Returns are simple daily returns. Expected returns are arithmetic means of daily returns and the covariance matrix is the sample covariance; neither is annualized. Sharpe ratios are return divided by standard deviation with no risk-free rate.

Per-ticker statistics:
ticker | mean daily return | daily std dev
{% for s in stats -%}
{{ s.ticker }} | {{ s.mean }} | {{ s.std }}
{% endfor %}
Daily returns{% if truncated %} (first and last {{ preview_rows }} of {{ rows }} rows){% endif %}:
date | {{ tickers | join(' | ') }}
{% for line in table -%}
{{ line }}
{% endfor %}
Guidelines:
- Use return_table to look at rows, summaries or correlations you cannot see above.
- When the user asks for the efficient frontier or the Sharpe ratio distribution, call the matching plot tool; it draws the chart for the user and returns a summary for you.
- Frontier points come from random long-only weightings, not an optimizer; say so when recommending weights.
- Quote numbers from tool output or the tables above. If the data cannot answer the question, say so.
";

/// Render the system prompt for one fetch
pub fn system_prompt(ctx: &PortfolioContext) -> Result<String> {
    let matrix = &ctx.matrix;
    let std_devs = ctx.stats.std_devs();
    let stats: Vec<_> = ctx
        .stats
        .tickers()
        .iter()
        .enumerate()
        .map(|(j, ticker)| {
            context! {
                ticker => ticker,
                mean => format!("{:.6}", ctx.stats.expected_returns()[j]),
                std => format!("{:.6}", std_devs[j]),
            }
        })
        .collect();

    let (table, truncated) = preview_lines(matrix);
    let dates = matrix.dates();
    let env = Environment::new();
    env.render_str(
        SYSTEM_TEMPLATE,
        context! {
            tickers => matrix.tickers(),
            first_date => dates.first().map(ToString::to_string),
            last_date => dates.last().map(ToString::to_string),
            rows => matrix.n_rows(),
            stats => stats,
            table => table,
            truncated => truncated,
            preview_rows => PREVIEW_ROWS,
        },
    )
    .map_err(|e| PortfolioError::AgentFailure(format!("failed to render system prompt: {e}")))
}

/// Table lines for the prompt: all rows, or head and tail with a gap marker
fn preview_lines(matrix: &ReturnMatrix) -> (Vec<String>, bool) {
    let n = matrix.n_rows();
    let line = |i: usize| {
        let cells: Vec<String> = matrix
            .row_values(i)
            .iter()
            .map(|v| format!("{v:.6}"))
            .collect();
        format!("{} | {}", matrix.dates()[i], cells.join(" | "))
    };

    if n <= PREVIEW_ROWS * 2 {
        return ((0..n).map(line).collect(), false);
    }
    let mut lines: Vec<String> = (0..PREVIEW_ROWS).map(line).collect();
    lines.push("...".to_string());
    lines.extend((n - PREVIEW_ROWS..n).map(line));
    (lines, true)
}
