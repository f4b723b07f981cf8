use crate::config::FetchConfig;
use crate::domain::model::Ticker;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "price-etl")]
#[command(about = "Download daily closing prices into one CSV per ticker and period")]
pub struct CliArgs {
    /// TOML config file; without it the built-in Dow 30 run is used
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base directory for the period folders
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Comma-separated ticker list replacing the configured one
    #[arg(long, value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Number of downloads in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// List the download tasks without fetching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Log process CPU and memory after each period
    #[arg(long)]
    pub monitor: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliArgs {
    /// Loads the config file (or defaults) and applies command-line overrides.
    pub fn resolve_config(&self) -> Result<FetchConfig> {
        let mut config = match &self.config {
            Some(path) => FetchConfig::from_file(path)?,
            None => FetchConfig::default(),
        };
        self.apply_overrides(&mut config)?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut FetchConfig) -> Result<()> {
        if let Some(dir) = &self.output_dir {
            tracing::debug!("🔧 Output directory overridden to: {}", dir);
            config.output.base_dir = dir.clone();
        }

        if !self.tickers.is_empty() {
            config.tickers = self
                .tickers
                .iter()
                .map(|raw| Ticker::parse(raw))
                .collect::<Result<Vec<_>>>()?;
            tracing::debug!("🔧 Ticker list overridden ({} tickers)", config.tickers.len());
        }

        if let Some(concurrency) = self.concurrency {
            config.run.concurrent_requests = concurrency;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_means_reference_run() {
        let args = CliArgs::parse_from(["price-etl"]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.tickers.len(), 30);
        assert_eq!(config.output.base_dir, ".");
        assert!(!args.dry_run);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::parse_from([
            "price-etl",
            "--output-dir",
            "/tmp/out",
            "--tickers",
            "aapl,msft",
            "--concurrency",
            "4",
            "--dry-run",
        ]);
        let config = args.resolve_config().unwrap();
        assert_eq!(config.output.base_dir, "/tmp/out");
        let symbols: Vec<&str> = config.tickers.iter().map(|t| t.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(config.run.concurrent_requests, 4);
        assert!(args.dry_run);
    }

    #[test]
    fn test_invalid_ticker_override() {
        let args = CliArgs::parse_from(["price-etl", "--tickers", "AAPL,a/b"]);
        assert!(args.resolve_config().is_err());
    }
}
