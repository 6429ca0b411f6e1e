use bike_client::{run_batch, BatchRunConfig, UnexpectedStatusPolicy};
use clap::Parser;
use crazybike::config::AppConfig;
use crazybike::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "bike-client")]
#[command(about = "Schedules a paced batch of bike orders and tallies the outcomes", long_about = None)]
struct Args {
    /// Number of orchestrations to schedule
    #[arg(short, long, default_value = "10")]
    total: i64,

    /// Seconds between consecutive submissions
    #[arg(short, long, default_value = "5")]
    interval: f64,

    /// Store URL (or set BIKE_STORE_URL / DATABASE_URL)
    #[arg(short = 'u', long)]
    store_url: Option<String>,

    /// PostgreSQL schema for the store (or set BIKE_STORE_SCHEMA)
    #[arg(long)]
    schema: Option<String>,

    /// Outstanding completion waits; 1 waits sequentially (or set BIKE_WAIT_CONCURRENCY)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Stop the batch when an instance reports a non-terminal status
    #[arg(long)]
    abort_on_unexpected: bool,

    /// Run orchestrations and activities in this process
    #[arg(long)]
    embedded_worker: bool,

    /// Drop the PostgreSQL store schema when done
    #[arg(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging("info")?;

    let args = Args::parse();
    let mut app = AppConfig::from_env()?;
    if let Some(url) = args.store_url {
        app.store_url = url;
    }
    if let Some(schema) = args.schema {
        app.store_schema = schema;
    }
    if let Some(concurrency) = args.concurrency {
        app.wait_concurrency = concurrency;
    }
    if args.abort_on_unexpected {
        app.unexpected_status = UnexpectedStatusPolicy::Abort;
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling batch");
            on_signal.cancel();
        }
    });

    let config = BatchRunConfig {
        total: args.total,
        interval_secs: args.interval,
        app,
        embedded_worker: args.embedded_worker,
        cleanup: args.cleanup,
    };

    let result = run_batch(config, cancel).await?;
    eprintln!(
        "\nFINAL RESULTS: {} completed, {} failed, {} total orchestrations",
        result.completed, result.failed, result.total
    );
    if result.skipped() > 0 {
        eprintln!(
            "Skipped: {} not scheduled, {} wait errors, {} unexpected statuses",
            result.not_scheduled, result.wait_errors, result.unexpected
        );
    }

    Ok(())
}
