//! Read-only inspection of the return matrix

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use portfolio_core::{PortfolioError, Result};
use portfolio_llm::tools::schema;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::context::PortfolioContext;
use crate::tool::Tool;

const DEFAULT_ROW_LIMIT: usize = 20;
const MAX_ROW_LIMIT: usize = 250;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum View {
    Describe,
    Rows,
    Correlation,
}

#[derive(Debug, Deserialize)]
struct Args {
    view: View,
    #[serde(default)]
    start: Option<NaiveDate>,
    #[serde(default)]
    end: Option<NaiveDate>,
    #[serde(default)]
    limit: Option<usize>,
}

/// Lets the model look at the daily returns behind the statistics
pub struct ReturnTableTool {
    context: Arc<PortfolioContext>,
}

impl ReturnTableTool {
    pub fn new(context: Arc<PortfolioContext>) -> Self {
        Self { context }
    }

    fn describe(&self) -> Value {
        let matrix = &self.context.matrix;
        let stats = &self.context.stats;
        let std_devs = stats.std_devs();

        let columns: Vec<Value> = matrix
            .tickers()
            .iter()
            .enumerate()
            .map(|(j, ticker)| {
                let column = matrix.values().column(j);
                json!({
                    "ticker": ticker,
                    "count": column.len(),
                    "mean": stats.expected_returns()[j],
                    "std": std_devs[j],
                    "min": column.min(),
                    "max": column.max(),
                })
            })
            .collect();

        json!({
            "first_date": matrix.dates().first(),
            "last_date": matrix.dates().last(),
            "columns": columns,
        })
    }

    fn rows(&self, args: &Args) -> Result<Value> {
        if let (Some(start), Some(end)) = (args.start, args.end) {
            if start > end {
                return Err(PortfolioError::InvalidInput(format!(
                    "start {start} is after end {end}"
                )));
            }
        }

        let matrix = &self.context.matrix;
        let limit = args.limit.unwrap_or(DEFAULT_ROW_LIMIT).clamp(1, MAX_ROW_LIMIT);
        let selected = matrix.rows_between(args.start, args.end);

        let rows: Vec<Value> = selected
            .iter()
            .take(limit)
            .map(|&i| json!({ "date": matrix.dates()[i], "returns": matrix.row_values(i) }))
            .collect();

        Ok(json!({
            "columns": matrix.tickers(),
            "total_rows": selected.len(),
            "truncated": selected.len() > limit,
            "rows": rows,
        }))
    }

    fn correlation(&self) -> Value {
        json!({
            "tickers": self.context.stats.tickers(),
            "matrix": self.context.stats.correlation(),
        })
    }
}

#[async_trait]
impl Tool for ReturnTableTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let args: Args = serde_json::from_value(params)
            .map_err(|e| PortfolioError::InvalidInput(format!("invalid arguments: {e}")))?;

        match args.view {
            View::Describe => Ok(self.describe()),
            View::Rows => self.rows(&args),
            View::Correlation => Ok(self.correlation()),
        }
    }

    fn name(&self) -> &str {
        "return_table"
    }

    fn description(&self) -> &str {
        "Inspect the daily return matrix (one row per trading date, one column per ticker). \
         view=describe gives per-ticker count/mean/std/min/max; view=rows lists daily returns, \
         optionally between start and end dates (YYYY-MM-DD), at most `limit` rows; \
         view=correlation gives the correlation matrix (null where a ticker never moved)."
    }

    fn input_schema(&self) -> Value {
        schema::object(
            json!({
                "view": schema::string_enum("What to return", &["describe", "rows", "correlation"]),
                "start": schema::string("First date to include for view=rows (YYYY-MM-DD)"),
                "end": schema::string("Last date to include for view=rows (YYYY-MM-DD)"),
                "limit": schema::integer("Maximum rows for view=rows (default 20, max 250)"),
            }),
            &["view"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{RecordingRenderer, context};

    fn tool() -> ReturnTableTool {
        ReturnTableTool::new(context(Arc::new(RecordingRenderer::default())))
    }

    #[tokio::test]
    async fn test_describe() {
        let output = tool().execute(json!({"view": "describe"})).await.unwrap();

        assert_eq!(output["first_date"], "2024-01-02");
        assert_eq!(output["last_date"], "2024-01-05");
        let aapl = &output["columns"][0];
        assert_eq!(aapl["ticker"], "AAPL");
        assert_eq!(aapl["count"], 4);
        assert!((aapl["mean"].as_f64().unwrap() - 0.005).abs() < 1e-12);
        assert_eq!(aapl["min"], -0.006);
        assert_eq!(aapl["max"], 0.012);
    }

    #[tokio::test]
    async fn test_rows_with_range_and_limit() {
        let output = tool()
            .execute(json!({"view": "rows", "start": "2024-01-03", "limit": 2}))
            .await
            .unwrap();

        assert_eq!(output["total_rows"], 3);
        assert_eq!(output["truncated"], true);
        let rows = output["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["date"], "2024-01-03");
        assert_eq!(rows[0]["returns"], json!([-0.006, 0.002]));
    }

    #[tokio::test]
    async fn test_rows_rejects_inverted_range() {
        let result = tool()
            .execute(json!({"view": "rows", "start": "2024-01-05", "end": "2024-01-02"}))
            .await;
        assert!(matches!(result, Err(PortfolioError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_correlation() {
        let output = tool().execute(json!({"view": "correlation"})).await.unwrap();
        assert_eq!(output["tickers"], json!(["AAPL", "MSFT"]));
        let diagonal = output["matrix"][0][0].as_f64().unwrap();
        assert!((diagonal - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_invalid_view() {
        let result = tool().execute(json!({"view": "plot"})).await;
        assert!(matches!(result, Err(PortfolioError::InvalidInput(_))));

        let result = tool().execute(json!({})).await;
        assert!(matches!(result, Err(PortfolioError::InvalidInput(_))));
    }
}
