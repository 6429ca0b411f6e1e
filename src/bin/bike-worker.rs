use std::time::Duration;

use clap::Parser;
use crazybike::config::AppConfig;
use crazybike::logging::init_logging;
use crazybike::orchestration::start_runtime;
use crazybike::store;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "bike-worker")]
#[command(about = "Runs Crazy Bike Shop orchestrations and activities", long_about = None)]
struct Args {
    /// Store URL (or set BIKE_STORE_URL / DATABASE_URL)
    #[arg(short = 'u', long)]
    store_url: Option<String>,

    /// PostgreSQL schema for the store (or set BIKE_STORE_SCHEMA)
    #[arg(long)]
    schema: Option<String>,

    /// Simulated work time per activity in milliseconds (or set BIKE_ACTIVITY_DELAY_MS)
    #[arg(long)]
    activity_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("info")?;

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(url) = args.store_url {
        config.store_url = url;
    }
    if let Some(schema) = args.schema {
        config.store_schema = schema;
    }
    if let Some(ms) = args.activity_delay_ms {
        config.activity_delay = Duration::from_millis(ms);
    }

    let store_config = config.store()?;
    if !store_config.is_shared() {
        warn!("Worker is using an in-memory store; no other process can schedule work for it");
    }
    let store = store::connect(&store_config).await?;
    let runtime = start_runtime(store, &config.worker()).await;

    info!("Worker started and waiting for tasks...");
    tokio::signal::ctrl_c().await?;

    info!("Stopping worker");
    runtime.shutdown(None).await;
    Ok(())
}
