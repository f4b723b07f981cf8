use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::utils::error::{EtlError, Result};

/// Equity symbol as the provider knows it. Also used as the output file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self> {
        let symbol = raw.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(EtlError::InvalidConfigValue {
                field: "tickers".to_string(),
                value: raw.to_string(),
                reason: "Ticker cannot be empty".to_string(),
            });
        }
        if let Some(bad) = symbol
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=')))
        {
            return Err(EtlError::InvalidConfigValue {
                field: "tickers".to_string(),
                value: raw.to_string(),
                reason: format!("Unsupported character '{}' in ticker", bad),
            });
        }
        if symbol.chars().all(|c| c == '.') {
            return Err(EtlError::InvalidConfigValue {
                field: "tickers".to_string(),
                value: raw.to_string(),
                reason: "Ticker cannot consist only of dots".to_string(),
            });
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ticker {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named date range; every ticker of the run is downloaded into `folder`.
/// `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub folder: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(folder: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            folder: folder.into(),
            start,
            end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {} in '{}/'", self.start, self.end, self.folder)
    }
}

/// One daily row as delivered by the provider, before column reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
}

impl DailyBar {
    pub fn with_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: Some(close),
            adj_close: None,
            volume: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Closing prices in ascending date order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub index: usize,
    pub period: Period,
    pub ticker: Ticker,
}

impl DownloadTask {
    /// `<folder>/<TICKER>.csv`, relative to the output base directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.period.folder).join(format!("{}.csv", self.ticker))
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub series: PriceSeries,
    pub csv_output: String,
    pub dropped_rows: usize,
}

#[derive(Debug)]
pub enum TaskOutcome {
    Written { rows: usize, path: PathBuf },
    /// No rows in range. `path` is set when a header-only file was written.
    Empty { path: Option<PathBuf> },
    Failed { error: EtlError },
}

impl TaskOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(DownloadTask, TaskOutcome)>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TaskOutcome::Written { .. }))
            .count()
    }

    pub fn empty(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, TaskOutcome::Empty { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_failed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&DownloadTask, &EtlError)> {
        self.outcomes.iter().filter_map(|(task, outcome)| match outcome {
            TaskOutcome::Failed { error } => Some((task, error)),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ticker_parse() {
        assert_eq!(Ticker::parse("aapl").unwrap().as_str(), "AAPL");
        assert_eq!(Ticker::parse(" BRK-B ").unwrap().as_str(), "BRK-B");
        assert!(Ticker::parse("^GSPC").is_ok());
        assert!(Ticker::parse("").is_err());
        assert!(Ticker::parse("../etc").is_err());
        assert!(Ticker::parse("A/B").is_err());
        assert!(Ticker::parse("..").is_err());
    }

    #[test]
    fn test_period_is_half_open() {
        let period = Period::new("data", date(2024, 8, 1), date(2024, 12, 31));
        assert!(period.contains(date(2024, 8, 1)));
        assert!(period.contains(date(2024, 12, 30)));
        assert!(!period.contains(date(2024, 12, 31)));
        assert!(!period.contains(date(2024, 7, 31)));
        assert!(!period.is_empty());
        assert!(Period::new("x", date(2024, 8, 1), date(2024, 8, 1)).is_empty());
    }

    #[test]
    fn test_task_relative_path() {
        let task = DownloadTask {
            index: 0,
            period: Period::new("data_q1", date(2025, 1, 1), date(2025, 4, 1)),
            ticker: Ticker::parse("MSFT").unwrap(),
        };
        assert_eq!(task.relative_path(), PathBuf::from("data_q1").join("MSFT.csv"));
    }
}
