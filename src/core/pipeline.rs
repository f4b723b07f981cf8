use crate::config::EmptySeriesPolicy;
use crate::core::transform::{reduce_to_close, render_csv};
use crate::core::{DailyBar, DownloadTask, Pipeline, PriceProvider, Result, Storage, TransformResult};
use crate::domain::model::Period;
use crate::utils::error::EtlError;
use std::path::{Path, PathBuf};

/// Fetch one ticker for one period, keep the close, write `<folder>/<TICKER>.csv`.
pub struct DownloadPipeline<P: PriceProvider, S: Storage> {
    provider: P,
    storage: S,
    auto_adjust: bool,
    on_empty: EmptySeriesPolicy,
}

impl<P: PriceProvider, S: Storage> DownloadPipeline<P, S> {
    pub fn new(provider: P, storage: S) -> Self {
        Self {
            provider,
            storage,
            auto_adjust: true,
            on_empty: EmptySeriesPolicy::WriteHeader,
        }
    }

    pub fn with_auto_adjust(mut self, auto_adjust: bool) -> Self {
        self.auto_adjust = auto_adjust;
        self
    }

    pub fn with_empty_policy(mut self, on_empty: EmptySeriesPolicy) -> Self {
        self.on_empty = on_empty;
        self
    }
}

#[async_trait::async_trait]
impl<P: PriceProvider, S: Storage> Pipeline for DownloadPipeline<P, S> {
    async fn prepare(&self, period: &Period) -> Result<()> {
        self.storage.ensure_dir(Path::new(&period.folder)).await
    }

    async fn extract(&self, task: &DownloadTask) -> Result<Vec<DailyBar>> {
        tracing::debug!(
            "Requesting {} {} → {} from {}",
            task.ticker,
            task.period.start,
            task.period.end,
            self.provider.name()
        );
        self.provider
            .fetch_daily(task.ticker.as_str(), task.period.start, task.period.end)
            .await
    }

    async fn transform(&self, task: &DownloadTask, bars: Vec<DailyBar>) -> Result<TransformResult> {
        let (series, dropped_rows) = reduce_to_close(bars, &task.period, self.auto_adjust)
            .map_err(|e| match e {
                EtlError::Processing { message } => {
                    EtlError::processing(format!("{}: {}", task.ticker, message))
                }
                other => other,
            })?;

        if dropped_rows > 0 {
            tracing::debug!("{}: dropped {} rows", task.ticker, dropped_rows);
        }

        let csv_output = render_csv(&series)?;
        Ok(TransformResult {
            series,
            csv_output,
            dropped_rows,
        })
    }

    async fn load(&self, task: &DownloadTask, result: TransformResult) -> Result<Option<PathBuf>> {
        if result.series.is_empty() && self.on_empty == EmptySeriesPolicy::Skip {
            return Ok(None);
        }

        let path = task.relative_path();
        self.storage
            .write_file(&path, result.csv_output.as_bytes())
            .await?;
        Ok(Some(path))
    }
}
