//! Tools exposed to the portfolio agent

pub mod frontier;
pub mod return_table;
pub mod sharpe;

pub use frontier::PlotFrontierTool;
pub use return_table::ReturnTableTool;
pub use sharpe::PlotSharpeTool;
