pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{LocalStorage, YahooChartProvider};
pub use config::{EmptySeriesPolicy, FetchConfig};
pub use core::{etl::EtlEngine, pipeline::DownloadPipeline};
pub use domain::model::{Period, RunReport, TaskOutcome, Ticker};
pub use utils::error::{EtlError, Result};
