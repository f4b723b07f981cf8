use clap::Parser;
use price_etl::core::etl::plan_tasks;
use price_etl::utils::{logger, validation::Validate};
use price_etl::{CliArgs, DownloadPipeline, EtlEngine, LocalStorage, YahooChartProvider};

const EXIT_TASK_FAILURES: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting price-etl");
    tracing::debug!("CLI args: {:?}", args);

    let config = match args.resolve_config().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No downloads will happen");
        println!(
            "{} tasks planned ({} tickers × {} periods)",
            config.task_count(),
            config.tickers.len(),
            config.periods.len()
        );
        let storage = LocalStorage::new(&config.output.base_dir);
        for task in plan_tasks(&config.periods, &config.tickers) {
            println!(
                "{} {} → {}  {}",
                task.ticker,
                task.period.start,
                task.period.end,
                storage.resolve(&task.relative_path()).display()
            );
        }
        return Ok(());
    }

    let provider = YahooChartProvider::new(&config.provider)?;
    let storage = LocalStorage::new(&config.output.base_dir);
    let pipeline = DownloadPipeline::new(provider, storage)
        .with_auto_adjust(config.provider.auto_adjust)
        .with_empty_policy(config.output.on_empty);

    let engine = EtlEngine::new_with_monitoring(pipeline, args.monitor)
        .with_concurrency(config.run.concurrent_requests);

    let report = engine.run(&config.periods, &config.tickers).await;

    println!(
        "Downloads finished: {} written, {} empty, {} failed (of {})",
        report.written(),
        report.empty(),
        report.failed(),
        report.outcomes.len()
    );

    if report.is_success() {
        println!("✅ All downloads completed.");
        return Ok(());
    }

    for (task, error) in report.failures() {
        tracing::error!(
            "❌ {}/{}: {} (Category: {:?}, Severity: {:?})",
            task.period.folder,
            task.ticker,
            error,
            error.category(),
            error.severity()
        );
        eprintln!("❌ {}", error.user_friendly_message());
        eprintln!("💡 {}", error.recovery_suggestion());
    }
    std::process::exit(EXIT_TASK_FAILURES);
}
