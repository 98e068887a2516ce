//! Monte Carlo sampling of random long-only portfolios
//!
//! Each trial draws independent uniforms, normalizes them into weights and
//! evaluates expected return, volatility and Sharpe ratio against the
//! supplied statistics. The resulting point cloud approximates the
//! efficient frontier; no optimizer is involved.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{PortfolioError, Result};
use crate::stats::PortfolioStatistics;

/// Trials per visualization request
pub const DEFAULT_TRIALS: usize = 10_000;

/// What to do with a portfolio whose volatility is exactly zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroVolatilityPolicy {
    /// Keep the point with no Sharpe ratio
    #[default]
    Undefined,
    /// Drop the trial
    Skip,
}

/// Sampler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub trials: usize,
    /// Fixed seed for reproducible point clouds; `None` seeds from the OS
    pub seed: Option<u64>,
    pub zero_volatility: ZeroVolatilityPolicy,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            zero_volatility: ZeroVolatilityPolicy::default(),
        }
    }
}

impl SamplerConfig {
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_zero_volatility(mut self, policy: ZeroVolatilityPolicy) -> Self {
        self.zero_volatility = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(PortfolioError::Config(
                "trial count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// One sampled portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledPortfolio {
    /// Non-negative weights summing to 1, aligned to the statistics' tickers
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub std_dev: f64,
    /// `None` when `std_dev` is zero
    pub sharpe_ratio: Option<f64>,
}

/// Monte Carlo frontier sampler
#[derive(Debug, Clone, Default)]
pub struct FrontierSampler {
    config: SamplerConfig,
}

impl FrontierSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample using the configured seed, or OS entropy when there is none
    pub fn sample(&self, stats: &PortfolioStatistics) -> Result<Vec<SampledPortfolio>> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.sample_with_rng(stats, &mut rng)
    }

    /// Sample with a caller-supplied random source
    #[instrument(skip_all, fields(trials = self.config.trials, instruments = stats.len()))]
    pub fn sample_with_rng<R: Rng>(
        &self,
        stats: &PortfolioStatistics,
        rng: &mut R,
    ) -> Result<Vec<SampledPortfolio>> {
        self.config.validate()?;

        let mu = stats.expected_returns();
        let sigma = stats.covariance();
        let k = mu.len();
        if k == 0 || sigma.nrows() != k || sigma.ncols() != k {
            return Err(PortfolioError::ComputationFailure(format!(
                "cannot sample {k} instruments against a {}x{} covariance matrix",
                sigma.nrows(),
                sigma.ncols()
            )));
        }

        let mut points = Vec::with_capacity(self.config.trials);
        let mut skipped = 0usize;
        for _ in 0..self.config.trials {
            let weights = random_weights(k, rng);
            let (expected_return, std_dev) = evaluate(&weights, mu, sigma);
            let sharpe_ratio = (std_dev > 0.0).then(|| expected_return / std_dev);

            if sharpe_ratio.is_none() && self.config.zero_volatility == ZeroVolatilityPolicy::Skip {
                skipped += 1;
                continue;
            }

            points.push(SampledPortfolio {
                weights: weights.iter().copied().collect(),
                expected_return,
                std_dev,
                sharpe_ratio,
            });
        }

        debug!(points = points.len(), skipped, "Sampled portfolios");
        Ok(points)
    }
}

/// Normalized independent uniform draws
///
/// The all-zero draw cannot be normalized and is redrawn.
fn random_weights<R: Rng>(k: usize, rng: &mut R) -> DVector<f64> {
    loop {
        let draws = DVector::from_fn(k, |_, _| rng.random::<f64>());
        let total = draws.sum();
        if total > 0.0 {
            return draws / total;
        }
    }
}

/// Expected return and standard deviation of a weighted portfolio
///
/// Round-off on a singular covariance can push the variance slightly below
/// zero; it is clamped so the standard deviation stays real.
pub fn evaluate(weights: &DVector<f64>, mu: &DVector<f64>, sigma: &DMatrix<f64>) -> (f64, f64) {
    let expected_return = weights.dot(mu);
    let variance = weights.dot(&(sigma * weights));
    (expected_return, variance.max(0.0).sqrt())
}
