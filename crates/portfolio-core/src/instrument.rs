//! Instrument identifiers, lookup records and raw observations

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioError, Result};

/// Stable numeric instrument key (the CRSP PERMNO)
///
/// Tickers get reused and reassigned over time; this identifier does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(pub i64);

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a ticker lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub id: InstrumentId,
    pub ticker: String,
    pub company_name: Option<String>,
}

impl InstrumentRecord {
    pub fn new(id: InstrumentId, ticker: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            id,
            ticker: ticker.into(),
            company_name: Some(company_name.into()),
        }
    }
}

/// Identifier ↔ ticker mapping for one fetch
///
/// Built from lookup records in query order. When a ticker appears more than
/// once the last record wins, so ordering the lookup by name-end date keeps
/// the most recent listing.
#[derive(Debug, Clone, Default)]
pub struct InstrumentMap {
    by_id: BTreeMap<InstrumentId, InstrumentRecord>,
}

impl InstrumentMap {
    pub fn from_records(records: impl IntoIterator<Item = InstrumentRecord>) -> Self {
        let mut latest: HashMap<String, (usize, InstrumentRecord)> = HashMap::new();
        for (position, record) in records.into_iter().enumerate() {
            latest.insert(record.ticker.clone(), (position, record));
        }

        // Replay survivors in query order so the last record also wins per identifier
        let mut survivors: Vec<(usize, InstrumentRecord)> = latest.into_values().collect();
        survivors.sort_by_key(|(position, _)| *position);
        let by_id = survivors
            .into_iter()
            .map(|(_, record)| (record.id, record))
            .collect();
        Self { by_id }
    }

    pub fn ticker(&self, id: InstrumentId) -> Option<&str> {
        self.by_id.get(&id).map(|r| r.ticker.as_str())
    }

    pub fn contains(&self, id: InstrumentId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Identifiers in ascending order
    pub fn ids(&self) -> Vec<InstrumentId> {
        self.by_id.keys().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &InstrumentRecord> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Requested tickers that did not resolve to any identifier
    pub fn missing_tickers<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        let known: HashSet<&str> = self.by_id.values().map(|r| r.ticker.as_str()).collect();
        requested
            .iter()
            .map(String::as_str)
            .filter(|t| !known.contains(t))
            .collect()
    }
}

/// One trading day of one instrument
///
/// CRSP leaves gaps, so every measured field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub id: InstrumentId,
    pub price: Option<f64>,
    pub volume: Option<f64>,
    pub ret: Option<f64>,
}

impl Observation {
    /// Observation carrying only a return
    pub fn with_return(date: NaiveDate, id: InstrumentId, ret: f64) -> Self {
        Self {
            date,
            id,
            price: None,
            volume: None,
            ret: Some(ret),
        }
    }

    /// The return, treating NaN and infinities as missing
    pub fn usable_return(&self) -> Option<f64> {
        self.ret.filter(|r| r.is_finite())
    }
}

/// Inclusive date range for an observation fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(PortfolioError::InvalidInput(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
                PortfolioError::InvalidInput(format!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Split comma-separated ticker text into upper-cased unique symbols
///
/// Order of first appearance is kept. Fails when nothing is left.
pub fn normalize_tickers(text: &str) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let tickers: Vec<String> = text
        .split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if tickers.is_empty() {
        return Err(PortfolioError::InvalidInput(
            "no tickers given (expected e.g. AAPL, MSFT)".to_string(),
        ));
    }
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_tickers() {
        let tickers = normalize_tickers(" aapl, MSFT ,,tsla, AAPL ").unwrap();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn test_normalize_tickers_empty() {
        assert!(matches!(
            normalize_tickers(" , ,"),
            Err(PortfolioError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_instrument_map_keeps_last_record_per_ticker() {
        let map = InstrumentMap::from_records(vec![
            InstrumentRecord::new(InstrumentId(1), "GOOG", "GOOGLE INC"),
            InstrumentRecord::new(InstrumentId(3), "MSFT", "MICROSOFT CORP"),
            InstrumentRecord::new(InstrumentId(2), "GOOG", "ALPHABET INC"),
        ]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.ids(), vec![InstrumentId(2), InstrumentId(3)]);
        assert_eq!(map.ticker(InstrumentId(2)), Some("GOOG"));
        assert!(!map.contains(InstrumentId(1)));
    }

    #[test]
    fn test_shared_identifier_labelled_by_last_record() {
        // A renamed company keeps its identifier under both tickers
        for _ in 0..200 {
            let map = InstrumentMap::from_records(vec![
                InstrumentRecord::new(InstrumentId(13407), "FB", "FACEBOOK INC"),
                InstrumentRecord::new(InstrumentId(13407), "META", "META PLATFORMS INC"),
            ]);
            assert_eq!(map.len(), 1);
            assert_eq!(map.ticker(InstrumentId(13407)), Some("META"));

            let requested = vec!["FB".to_string(), "META".to_string()];
            assert_eq!(map.missing_tickers(&requested), vec!["FB"]);
        }
    }

    #[test]
    fn test_missing_tickers() {
        let map = InstrumentMap::from_records(vec![InstrumentRecord::new(
            InstrumentId(1),
            "AAPL",
            "APPLE INC",
        )]);
        let requested = vec!["AAPL".to_string(), "ZZZZ".to_string()];
        assert_eq!(map.missing_tickers(&requested), vec!["ZZZZ"]);
    }

    #[test]
    fn test_usable_return_rejects_nan() {
        let mut obs = Observation::with_return(date(2024, 1, 2), InstrumentId(1), f64::NAN);
        assert_eq!(obs.usable_return(), None);
        obs.ret = Some(0.01);
        assert_eq!(obs.usable_return(), Some(0.01));
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::parse("2020-01-01", "2025-01-01").unwrap();
        assert_eq!(range.start(), date(2020, 1, 1));
        assert_eq!(range.to_string(), "2020-01-01 to 2025-01-01");

        assert!(DateRange::parse("2025-01-01", "2020-01-01").is_err());
        assert!(DateRange::parse("2020/01/01", "2025-01-01").is_err());
        // A single day is a valid range
        assert!(DateRange::parse("2024-03-01", "2024-03-01").is_ok());
    }
}
