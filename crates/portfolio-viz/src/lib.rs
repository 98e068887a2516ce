//! Chart rendering for portfolio-rs
//!
//! Three charts are produced from sampled portfolios and statistics:
//!
//! - the efficient-frontier point cloud (risk vs return, shaded by Sharpe ratio)
//! - the Sharpe-ratio distribution (50-bin histogram)
//! - mean return per ticker
//!
//! [`TerminalRenderer`] draws them as text; [`JsonRenderer`] writes chart
//! payloads for an external plotting front end.

pub mod histogram;
pub mod json;
pub mod renderer;
pub mod terminal;

pub use histogram::{Bin, SHARPE_BINS, histogram};
pub use json::JsonRenderer;
pub use renderer::Renderer;
pub use terminal::TerminalRenderer;
