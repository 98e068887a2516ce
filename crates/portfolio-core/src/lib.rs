//! Core portfolio analytics for portfolio-rs
//!
//! This crate holds everything that does not touch the network:
//!
//! - Domain types (instrument identifiers, observations, date ranges)
//! - The return matrix builder (pivot + complete-case filtering + ticker relabeling)
//! - The statistics computer (mean vector and sample covariance)
//! - The Monte Carlo frontier sampler and summaries of its point cloud
//! - The error taxonomy shared by every other crate in the workspace
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use portfolio_core::{
//!     FrontierSampler, InstrumentId, InstrumentMap, InstrumentRecord, Observation,
//!     SamplerConfig, build_return_matrix, compute_statistics,
//! };
//!
//! # fn main() -> portfolio_core::Result<()> {
//! let map = InstrumentMap::from_records(vec![
//!     InstrumentRecord::new(InstrumentId(10001), "AAPL", "APPLE INC"),
//!     InstrumentRecord::new(InstrumentId(10002), "MSFT", "MICROSOFT CORP"),
//! ]);
//! let d1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let d2 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
//! let observations = vec![
//!     Observation::with_return(d1, InstrumentId(10001), 0.01),
//!     Observation::with_return(d1, InstrumentId(10002), 0.02),
//!     Observation::with_return(d2, InstrumentId(10001), 0.03),
//!     Observation::with_return(d2, InstrumentId(10002), 0.015),
//! ];
//!
//! let matrix = build_return_matrix(&observations, &map)?;
//! let stats = compute_statistics(&matrix)?;
//! let points = FrontierSampler::new(SamplerConfig::default().with_trials(100).with_seed(7))
//!     .sample(&stats)?;
//! assert_eq!(points.len(), 100);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod instrument;
pub mod matrix;
pub mod sampler;
pub mod stats;
pub mod summary;

pub use error::{PortfolioError, Result};
pub use instrument::{
    DateRange, InstrumentId, InstrumentMap, InstrumentRecord, Observation, normalize_tickers,
};
pub use matrix::{ReturnMatrix, build_return_matrix};
pub use sampler::{
    DEFAULT_TRIALS, FrontierSampler, SampledPortfolio, SamplerConfig, ZeroVolatilityPolicy, evaluate,
};
pub use stats::{PortfolioStatistics, compute_statistics};
pub use summary::{FrontierSummary, LabelledPortfolio, SharpeSummary};
