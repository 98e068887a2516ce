//! Return matrix builder
//!
//! Reshapes long-format observations into a dense date × ticker table.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use nalgebra::DMatrix;
use tracing::{debug, info, instrument};

use crate::error::{PortfolioError, Result};
use crate::instrument::{InstrumentId, InstrumentMap, Observation};

/// Dense table of periodic returns
///
/// Rows are trading dates in ascending order, columns are tickers. Every cell
/// holds a finite return.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    values: DMatrix<f64>,
}

impl ReturnMatrix {
    /// Assemble a matrix from already-aligned parts
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, values: DMatrix<f64>) -> Result<Self> {
        if values.nrows() != dates.len() || values.ncols() != tickers.len() {
            return Err(PortfolioError::ComputationFailure(format!(
                "return matrix is {}x{} but has {} dates and {} tickers",
                values.nrows(),
                values.ncols(),
                dates.len(),
                tickers.len()
            )));
        }
        if dates.is_empty() || tickers.is_empty() {
            return Err(PortfolioError::EmptyResult(
                "return matrix has no complete rows".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PortfolioError::ComputationFailure(
                "return matrix contains non-finite values".to_string(),
            ));
        }
        Ok(Self {
            dates,
            tickers,
            values,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    /// Returns of one trading date, in column order
    pub fn row_values(&self, row: usize) -> Vec<f64> {
        self.values.row(row).iter().copied().collect()
    }

    /// Returns of one ticker, in date order
    pub fn column_by_ticker(&self, ticker: &str) -> Option<Vec<f64>> {
        let col = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.values.column(col).iter().copied().collect())
    }

    /// Row indices whose date falls inside `[start, end]`
    ///
    /// Open ends are unbounded.
    pub fn rows_between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<usize> {
        self.dates
            .iter()
            .enumerate()
            .filter(|(_, d)| start.is_none_or(|s| **d >= s) && end.is_none_or(|e| **d <= e))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Build the dense return matrix for one fetch
///
/// Any date with a missing return for any fetched instrument is dropped
/// entirely, including instruments that are not in `map` and get discarded
/// afterwards. Columns follow ascending identifier order.
#[instrument(skip_all, fields(observations = observations.len(), instruments = map.len()))]
pub fn build_return_matrix(observations: &[Observation], map: &InstrumentMap) -> Result<ReturnMatrix> {
    if observations.is_empty() {
        return Err(PortfolioError::EmptyResult(
            "no observations to build a return matrix from".to_string(),
        ));
    }

    let mut columns: BTreeSet<InstrumentId> = BTreeSet::new();
    let mut grid: BTreeMap<NaiveDate, HashMap<InstrumentId, Option<f64>>> = BTreeMap::new();
    for obs in observations {
        columns.insert(obs.id);
        let row = grid.entry(obs.date).or_default();
        if row.insert(obs.id, obs.usable_return()).is_some() {
            return Err(PortfolioError::ComputationFailure(format!(
                "duplicate observation for instrument {} on {}",
                obs.id, obs.date
            )));
        }
    }

    let total_dates = grid.len();
    let complete: Vec<(NaiveDate, HashMap<InstrumentId, Option<f64>>)> = grid
        .into_iter()
        .filter(|(_, row)| columns.iter().all(|id| matches!(row.get(id), Some(Some(_)))))
        .collect();
    debug!(
        total_dates,
        complete_dates = complete.len(),
        "Dropped dates with missing returns"
    );

    let (kept, dropped): (Vec<InstrumentId>, Vec<InstrumentId>) =
        columns.into_iter().partition(|id| map.contains(*id));
    if !dropped.is_empty() {
        debug!(?dropped, "Dropping instruments without a ticker mapping");
    }

    if complete.is_empty() || kept.is_empty() {
        return Err(PortfolioError::EmptyResult(format!(
            "no complete rows for the requested instruments ({} dates, {} mapped instruments)",
            complete.len(),
            kept.len()
        )));
    }

    let dates: Vec<NaiveDate> = complete.iter().map(|(d, _)| *d).collect();
    let tickers: Vec<String> = kept
        .iter()
        .filter_map(|id| map.ticker(*id).map(str::to_string))
        .collect();
    let values = DMatrix::from_fn(complete.len(), kept.len(), |r, c| {
        complete[r].1.get(&kept[c]).copied().flatten().unwrap_or(f64::NAN)
    });

    info!(
        rows = dates.len(),
        columns = tickers.len(),
        "Built return matrix"
    );
    ReturnMatrix::new(dates, tickers, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::InstrumentRecord;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn two_stock_map() -> InstrumentMap {
        InstrumentMap::from_records(vec![
            InstrumentRecord::new(InstrumentId(10001), "AAPL", "APPLE INC"),
            InstrumentRecord::new(InstrumentId(10002), "MSFT", "MICROSOFT CORP"),
        ])
    }

    #[test]
    fn test_scenario_two_tickers() {
        let obs = vec![
            Observation::with_return(date(2), InstrumentId(10001), 0.01),
            Observation::with_return(date(2), InstrumentId(10002), 0.02),
            Observation::with_return(date(3), InstrumentId(10001), 0.03),
            Observation::with_return(date(3), InstrumentId(10002), 0.015),
        ];

        let matrix = build_return_matrix(&obs, &two_stock_map()).unwrap();

        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.tickers(), &["AAPL".to_string(), "MSFT".to_string()]);
        assert_eq!(matrix.dates(), &[date(2), date(3)]);
        assert_eq!(matrix.column_by_ticker("MSFT"), Some(vec![0.02, 0.015]));
    }

    #[test]
    fn test_drops_dates_with_missing_values() {
        let mut missing = Observation::with_return(date(3), InstrumentId(10002), 0.0);
        missing.ret = None;
        let obs = vec![
            Observation::with_return(date(2), InstrumentId(10001), 0.01),
            Observation::with_return(date(2), InstrumentId(10002), 0.02),
            Observation::with_return(date(3), InstrumentId(10001), 0.03),
            missing,
            Observation::with_return(date(4), InstrumentId(10001), 0.05),
            Observation::with_return(date(4), InstrumentId(10002), 0.04),
        ];

        let matrix = build_return_matrix(&obs, &two_stock_map()).unwrap();
        assert_eq!(matrix.dates(), &[date(2), date(4)]);
        assert_eq!(matrix.row_values(1), vec![0.05, 0.04]);
    }

    #[test]
    fn test_absent_observation_counts_as_missing() {
        // MSFT has no row at all on the 3rd
        let obs = vec![
            Observation::with_return(date(2), InstrumentId(10001), 0.01),
            Observation::with_return(date(2), InstrumentId(10002), 0.02),
            Observation::with_return(date(3), InstrumentId(10001), 0.03),
        ];
        let matrix = build_return_matrix(&obs, &two_stock_map()).unwrap();
        assert_eq!(matrix.dates(), &[date(2)]);
    }

    #[test]
    fn test_unmapped_instrument_still_filters_rows() {
        let obs = vec![
            Observation::with_return(date(2), InstrumentId(10001), 0.01),
            Observation::with_return(date(2), InstrumentId(10002), 0.02),
            Observation::with_return(date(2), InstrumentId(99999), 0.00),
            Observation::with_return(date(3), InstrumentId(10001), 0.03),
            Observation::with_return(date(3), InstrumentId(10002), 0.015),
        ];

        let matrix = build_return_matrix(&obs, &two_stock_map()).unwrap();
        assert_eq!(matrix.n_cols(), 2);
        assert_eq!(matrix.dates(), &[date(2)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(matches!(
            build_return_matrix(&[], &two_stock_map()),
            Err(PortfolioError::EmptyResult(_))
        ));

        let obs = vec![Observation::with_return(date(2), InstrumentId(5), 0.01)];
        assert!(matches!(
            build_return_matrix(&obs, &two_stock_map()),
            Err(PortfolioError::EmptyResult(_))
        ));
    }

    #[test]
    fn test_duplicate_observation_rejected() {
        let obs = vec![
            Observation::with_return(date(2), InstrumentId(10001), 0.01),
            Observation::with_return(date(2), InstrumentId(10001), 0.02),
        ];
        assert!(matches!(
            build_return_matrix(&obs, &two_stock_map()),
            Err(PortfolioError::ComputationFailure(_))
        ));
    }

    #[test]
    fn test_rows_between() {
        let values = DMatrix::from_row_slice(3, 1, &[0.1, 0.2, 0.3]);
        let matrix =
            ReturnMatrix::new(vec![date(2), date(3), date(4)], vec!["AAPL".into()], values).unwrap();

        assert_eq!(matrix.rows_between(Some(date(3)), None), vec![1, 2]);
        assert_eq!(matrix.rows_between(None, Some(date(3))), vec![0, 1]);
        assert_eq!(matrix.rows_between(None, None).len(), 3);
    }

    #[test]
    fn test_new_rejects_shape_mismatch() {
        let values = DMatrix::from_row_slice(1, 2, &[0.1, 0.2]);
        assert!(ReturnMatrix::new(vec![date(2)], vec!["AAPL".into()], values).is_err());
    }
}
