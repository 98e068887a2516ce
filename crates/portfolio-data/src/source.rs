//! Market data source capability

use async_trait::async_trait;
use portfolio_core::{DateRange, InstrumentId, InstrumentRecord, Observation};

use crate::error::Result;

/// Read-only access to instrument names and daily observations
///
/// Implementations return empty vectors rather than errors when nothing
/// matches; callers decide whether that is fatal.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Resolve tickers to instrument records
    ///
    /// Records must be ordered so that, for each ticker, the most recent
    /// listing comes last.
    async fn lookup_instruments(&self, tickers: &[String]) -> Result<Vec<InstrumentRecord>>;

    /// Daily observations for `ids` within `range` (inclusive)
    async fn fetch_observations(
        &self,
        range: DateRange,
        ids: &[InstrumentId],
    ) -> Result<Vec<Observation>>;

    /// Human-readable description of the connection, for status output
    fn describe(&self) -> String;
}
