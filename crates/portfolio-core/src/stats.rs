//! Mean vector and sample covariance of a return matrix

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{PortfolioError, Result};
use crate::matrix::ReturnMatrix;

/// Minimum number of rows for a sample covariance
const MIN_ROWS: usize = 2;

/// Per-instrument expected returns and their covariance
///
/// Both are aligned to `tickers`. Returns are per period (daily for CRSP
/// daily data) and are not annualized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioStatistics {
    tickers: Vec<String>,
    expected_returns: DVector<f64>,
    covariance: DMatrix<f64>,
    observations: usize,
}

impl PortfolioStatistics {
    /// Build statistics from precomputed inputs
    ///
    /// Fails with `ComputationFailure` when the dimensions disagree.
    pub fn new(
        tickers: Vec<String>,
        expected_returns: DVector<f64>,
        covariance: DMatrix<f64>,
        observations: usize,
    ) -> Result<Self> {
        let k = expected_returns.len();
        if k == 0 {
            return Err(PortfolioError::ComputationFailure(
                "statistics need at least one instrument".to_string(),
            ));
        }
        if covariance.nrows() != k || covariance.ncols() != k || tickers.len() != k {
            return Err(PortfolioError::ComputationFailure(format!(
                "{k} expected returns, {} tickers and a {}x{} covariance matrix do not line up",
                tickers.len(),
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        Ok(Self {
            tickers,
            expected_returns,
            covariance,
            observations,
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn expected_returns(&self) -> &DVector<f64> {
        &self.expected_returns
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Number of return-matrix rows the statistics were computed from
    pub fn observations(&self) -> usize {
        self.observations
    }

    pub fn len(&self) -> usize {
        self.expected_returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected_returns.is_empty()
    }

    /// Per-instrument standard deviations (square roots of the diagonal)
    pub fn std_devs(&self) -> Vec<f64> {
        self.covariance
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect()
    }

    /// Pairwise correlation coefficients
    ///
    /// A pair involving a constant-return instrument has no correlation.
    pub fn correlation(&self) -> Vec<Vec<Option<f64>>> {
        let sd = self.std_devs();
        let k = self.len();
        (0..k)
            .map(|i| {
                (0..k)
                    .map(|j| {
                        let denom = sd[i] * sd[j];
                        (denom > 0.0).then(|| self.covariance[(i, j)] / denom)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Compute expected returns and sample covariance (divisor n − 1)
#[instrument(skip_all, fields(rows = matrix.n_rows(), columns = matrix.n_cols()))]
pub fn compute_statistics(matrix: &ReturnMatrix) -> Result<PortfolioStatistics> {
    let n = matrix.n_rows();
    if n < MIN_ROWS {
        return Err(PortfolioError::InsufficientData {
            required: MIN_ROWS,
            actual: n,
        });
    }

    let values = matrix.values();
    let k = values.ncols();
    let means: DVector<f64> = values.row_mean().transpose();

    let mut centered = values.clone();
    for (mut column, mean) in centered.column_iter_mut().zip(means.iter()) {
        column.add_scalar_mut(-mean);
    }

    // Upper triangle only, mirrored, so the matrix is exactly symmetric
    let mut covariance = DMatrix::zeros(k, k);
    for i in 0..k {
        for j in i..k {
            let cov = centered.column(i).dot(&centered.column(j)) / (n - 1) as f64;
            covariance[(i, j)] = cov;
            covariance[(j, i)] = cov;
        }
    }

    debug!(instruments = k, "Computed portfolio statistics");
    PortfolioStatistics::new(matrix.tickers().to_vec(), means, covariance, n)
}
