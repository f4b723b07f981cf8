#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::{Period, Ticker};
use crate::utils::error::{EtlError, Result};
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 道瓊工業指數 30 檔成分股
pub const DOW_30: [&str; 30] = [
    "AAPL", "AMGN", "AXP", "BA", "CAT", "CRM", "CSCO", "CVX", "DIS", "DOW", "GS", "HD", "HON",
    "IBM", "INTC", "JNJ", "JPM", "KO", "MCD", "MMM", "MRK", "MSFT", "NKE", "PG", "TRV", "UNH",
    "V", "VZ", "WBA", "WMT",
];

/// (folder, start, exclusive end)
pub const DEFAULT_PERIODS: [(&str, &str, &str); 2] = [
    ("data", "2024-08-01", "2024-12-31"),
    ("data_q1", "2025-01-01", "2025-04-01"),
];

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Everything a run needs. `Default` is the reference run: Dow 30 over two periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub tickers: Vec<Ticker>,
    pub periods: Vec<Period>,
    pub provider: ProviderConfig,
    pub output: OutputConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Use the split/dividend adjusted close when the provider has one.
    pub auto_adjust: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub base_dir: String,
    pub on_empty: EmptySeriesPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySeriesPolicy {
    #[default]
    WriteHeader,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub concurrent_requests: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            periods: default_periods(),
            provider: ProviderConfig::default(),
            output: OutputConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 30,
            retry_attempts: 2,
            retry_delay_ms: 500,
            auto_adjust: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: ".".to_string(),
            on_empty: EmptySeriesPolicy::WriteHeader,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: 1,
        }
    }
}

pub fn default_tickers() -> Vec<Ticker> {
    DOW_30
        .iter()
        .filter_map(|symbol| Ticker::parse(symbol).ok())
        .collect()
}

pub fn default_periods() -> Vec<Period> {
    DEFAULT_PERIODS
        .iter()
        .filter_map(|(folder, start, end)| {
            let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
            let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").ok()?;
            Some(Period::new(*folder, start, end))
        })
        .collect()
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}

impl FetchConfig {
    pub fn task_count(&self) -> usize {
        self.tickers.len() * self.periods.len()
    }
}

impl Validate for FetchConfig {
    fn validate(&self) -> Result<()> {
        if self.tickers.is_empty() {
            return Err(EtlError::MissingConfig {
                field: "tickers".to_string(),
            });
        }
        if self.periods.is_empty() {
            return Err(EtlError::MissingConfig {
                field: "periods".to_string(),
            });
        }

        for period in &self.periods {
            validation::validate_non_empty_string("periods.folder", &period.folder)?;
            validation::validate_relative_path("periods.folder", &period.folder)?;
            if period.end < period.start {
                return Err(EtlError::InvalidConfigValue {
                    field: "periods.end".to_string(),
                    value: period.end.to_string(),
                    reason: format!(
                        "End date must not precede start date {} for folder '{}'",
                        period.start, period.folder
                    ),
                });
            }
        }

        validation::validate_url("provider.base_url", &self.provider.base_url)?;
        validation::validate_non_empty_string("provider.user_agent", &self.provider.user_agent)?;
        validation::validate_range("provider.timeout_seconds", self.provider.timeout_seconds, 1, 600)?;
        validation::validate_range("provider.retry_attempts", self.provider.retry_attempts, 0, 10)?;
        validation::validate_path("output.base_dir", &self.output.base_dir)?;
        validation::validate_range(
            "run.concurrent_requests",
            self.run.concurrent_requests,
            1,
            32,
        )?;

        Ok(())
    }
}
