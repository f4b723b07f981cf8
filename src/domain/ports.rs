use crate::domain::model::{DailyBar, DownloadTask, Period, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub trait Storage: Send + Sync {
    fn ensure_dir(&self, path: &Path) -> impl std::future::Future<Output = Result<()>> + Send;
    fn write_file(
        &self,
        path: &Path,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Source of daily price history. `end` is exclusive.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Called once per period before any of its tasks run.
    async fn prepare(&self, period: &Period) -> Result<()>;
    async fn extract(&self, task: &DownloadTask) -> Result<Vec<DailyBar>>;
    async fn transform(&self, task: &DownloadTask, bars: Vec<DailyBar>) -> Result<TransformResult>;
    async fn load(&self, task: &DownloadTask, result: TransformResult)
        -> Result<Option<PathBuf>>;
}
