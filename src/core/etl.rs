use crate::core::{DownloadTask, Pipeline, Result};
use crate::domain::model::{Period, RunReport, TaskOutcome, Ticker};
use crate::utils::error::EtlError;
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Periods in order, tickers in order inside each period.
pub fn plan_tasks(periods: &[Period], tickers: &[Ticker]) -> Vec<DownloadTask> {
    periods
        .iter()
        .flat_map(|period| tickers.iter().map(move |ticker| (period, ticker)))
        .enumerate()
        .map(|(index, (period, ticker))| DownloadTask {
            index,
            period: period.clone(),
            ticker: ticker.clone(),
        })
        .collect()
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: Arc<P>,
    monitor: SystemMonitor,
    concurrency: usize,
}

impl<P: Pipeline + 'static> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            monitor: SystemMonitor::new(monitor_enabled),
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Downloads every (period, ticker) pair. A failing task never stops the others;
    /// its error ends up in the report.
    pub async fn run(&self, periods: &[Period], tickers: &[Ticker]) -> RunReport {
        let tasks = plan_tasks(periods, tickers);
        let mut report = RunReport::default();

        tracing::info!(
            "Starting download of {} tickers over {} periods ({} tasks, concurrency {})",
            tickers.len(),
            periods.len(),
            tasks.len(),
            self.concurrency
        );
        self.monitor.log_stats("Start");

        let mut remaining = tasks.into_iter();
        for period in periods {
            let period_tasks: Vec<DownloadTask> = remaining.by_ref().take(tickers.len()).collect();

            tracing::info!("Downloading period {}", period);

            if let Err(e) = self.pipeline.prepare(period).await {
                tracing::error!("❌ Cannot prepare '{}/': {}", period.folder, e);
                let message = e.to_string();
                for task in period_tasks {
                    let error = EtlError::Io(std::io::Error::other(format!(
                        "output directory '{}' unavailable: {}",
                        period.folder, message
                    )));
                    report.outcomes.push((task, TaskOutcome::Failed { error }));
                }
                continue;
            }

            let outcomes = if self.concurrency > 1 {
                self.run_concurrent(period_tasks).await
            } else {
                let mut outcomes = Vec::with_capacity(period_tasks.len());
                for task in period_tasks {
                    let outcome = run_task(self.pipeline.as_ref(), &task).await;
                    outcomes.push((task, outcome));
                }
                outcomes
            };
            report.outcomes.extend(outcomes);

            self.monitor.log_stats(&format!("Period '{}'", period.folder));
        }

        tracing::info!(
            "Finished: {} written, {} empty, {} failed",
            report.written(),
            report.empty(),
            report.failed()
        );
        self.monitor.log_final_stats();

        report
    }

    async fn run_concurrent(&self, tasks: Vec<DownloadTask>) -> Vec<(DownloadTask, TaskOutcome)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let pipeline = Arc::clone(&self.pipeline);
                let semaphore = Arc::clone(&semaphore);
                let owned = task.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    run_task(pipeline.as_ref(), &owned).await
                });
                (task, handle)
            })
            .collect();

        // 依任務順序收集結果
        let mut outcomes = Vec::with_capacity(handles.len());
        for (task, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    tracing::error!("❌ {} task aborted: {}", task.ticker, join_error);
                    TaskOutcome::Failed {
                        error: EtlError::processing(format!(
                            "{} task aborted: {}",
                            task.ticker, join_error
                        )),
                    }
                }
            };
            outcomes.push((task, outcome));
        }
        outcomes
    }
}

async fn run_task<P: Pipeline + ?Sized>(pipeline: &P, task: &DownloadTask) -> TaskOutcome {
    match execute(pipeline, task).await {
        Ok(outcome) => {
            match &outcome {
                TaskOutcome::Written { rows, path } => {
                    tracing::info!("  {}... ok ({} rows → {})", task.ticker, rows, path.display());
                }
                TaskOutcome::Empty { path: Some(path) } => {
                    tracing::warn!(
                        "  {}... no data between {} and {}, wrote header only to {}",
                        task.ticker,
                        task.period.start,
                        task.period.end,
                        path.display()
                    );
                }
                TaskOutcome::Empty { path: None } => {
                    tracing::warn!(
                        "  {}... no data between {} and {}, skipped",
                        task.ticker,
                        task.period.start,
                        task.period.end
                    );
                }
                TaskOutcome::Failed { .. } => {}
            }
            outcome
        }
        Err(error) => {
            tracing::error!("  {}... failed: {}", task.ticker, error);
            TaskOutcome::Failed { error }
        }
    }
}

async fn execute<P: Pipeline + ?Sized>(pipeline: &P, task: &DownloadTask) -> Result<TaskOutcome> {
    let bars = pipeline.extract(task).await?;
    let result = pipeline.transform(task, bars).await?;
    let rows = result.series.len();
    let path = pipeline.load(task, result).await?;

    Ok(match (rows, path) {
        (0, path) => TaskOutcome::Empty { path },
        (rows, Some(path)) => TaskOutcome::Written { rows, path },
        (_, None) => TaskOutcome::Empty { path: None },
    })
}
