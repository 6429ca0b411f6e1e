use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use crazybike::api::{self, AppState};
use crazybike::bike::BikeFactory;
use crazybike::client::DuroxideClient;
use crazybike::config::AppConfig;
use crazybike::logging::init_logging;
use crazybike::orchestration::start_runtime;
use crazybike::store;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "bike-api")]
#[command(about = "HTTP API for scheduling Crazy Bike Shop orders", long_about = None)]
struct Args {
    /// Address to listen on (or set BIKE_API_ADDR)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Store URL (or set BIKE_STORE_URL / DATABASE_URL)
    #[arg(short = 'u', long)]
    store_url: Option<String>,

    /// PostgreSQL schema for the store (or set BIKE_STORE_SCHEMA)
    #[arg(long)]
    schema: Option<String>,

    /// Do not run orchestrations and activities in this process
    #[arg(long)]
    no_worker: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging("info")?;

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.api_addr = bind;
    }
    if let Some(url) = args.store_url {
        config.store_url = url;
    }
    if let Some(schema) = args.schema {
        config.store_schema = schema;
    }

    let store_config = config.store()?;
    if args.no_worker && !store_config.is_shared() {
        warn!("--no-worker with an in-memory store: scheduled orchestrations will never run");
    }
    let store = store::connect(&store_config).await?;

    let runtime = if args.no_worker {
        None
    } else {
        Some(start_runtime(store.clone(), &config.worker()).await)
    };

    let client = DuroxideClient::new(store).with_wait_timeout(config.wait_timeout);
    let state = AppState::new(
        Arc::new(client),
        Arc::new(BikeFactory::new()),
        config.scheduler(),
    );
    let shutdown = state.shutdown.clone();

    let listener = tokio::net::TcpListener::bind(config.api_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.api_addr))?;
    info!(addr = %config.api_addr, "Crazy Bike Shop API listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
            shutdown.cancel();
        })
        .await?;

    if let Some(runtime) = runtime {
        runtime.shutdown(None).await;
    }
    info!("Crazy Bike Shop API stopped");
    Ok(())
}
