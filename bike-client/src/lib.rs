//! Batch client for the Crazy Bike Shop.
//!
//! Schedules a paced batch of bike-order orchestrations, waits for all of them
//! and reports the tally.
//!
//! # Quick Start
//!
//! ```bash
//! cargo run --release --package bike-client --bin bike-client -- --total 10 --interval 5
//! ```

use std::sync::Arc;

use anyhow::Result;
use crazybike::bike::BikeFactory;
use crazybike::client::DuroxideClient;
use crazybike::config::AppConfig;
use crazybike::orchestration::start_runtime;
use crazybike::scheduler::{BatchRequest, BatchResult, BatchScheduler, WaitMode};
use crazybike::store::{self, StoreConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use crazybike::scheduler::UnexpectedStatusPolicy;

/// One batch run.
#[derive(Debug, Clone)]
pub struct BatchRunConfig {
    pub total: i64,
    pub interval_secs: f64,
    pub app: AppConfig,
    /// Host the orchestration runtime in this process.
    pub embedded_worker: bool,
    /// Drop the PostgreSQL store schema once the batch finished.
    pub cleanup: bool,
}

/// Run one batch against the configured store.
pub async fn run_batch(config: BatchRunConfig, cancel: CancellationToken) -> Result<BatchResult> {
    let request = BatchRequest::with_max_total(
        config.total,
        config.interval_secs,
        config.app.max_batch_size,
    )?;
    let store_config = config.app.store()?;

    info!("=== Crazy Bike Shop batch client ===");
    info!(
        total = request.total_instances(),
        interval_secs = request.interval().as_secs_f64(),
        store = ?store_config,
        "Starting sequential orchestration scheduler"
    );

    let embedded_worker = config.embedded_worker || !store_config.is_shared();
    if embedded_worker && !config.embedded_worker {
        warn!("In-memory store selected; running an embedded worker");
    }

    let provider = store::connect(&store_config).await?;
    let runtime = if embedded_worker {
        Some(start_runtime(provider.clone(), &config.app.worker()).await)
    } else {
        None
    };

    let client = DuroxideClient::new(provider).with_wait_timeout(config.app.wait_timeout);
    let scheduler_config = config.app.scheduler();
    if let WaitMode::Concurrent { max_in_flight } = scheduler_config.wait_mode {
        info!(max_in_flight, "Waiting on completions concurrently");
    }
    let scheduler = BatchScheduler::new(
        Arc::new(client),
        Arc::new(BikeFactory::new()),
        scheduler_config,
    );

    let outcome = scheduler.run(&request, &cancel).await;

    if let Some(runtime) = runtime {
        runtime.shutdown(None).await;
    }
    if config.cleanup {
        cleanup_store(&store_config).await;
    }

    let result = outcome?;
    info!("All orchestrations completed. {}", result.summary());
    Ok(result)
}

/// Drop the PostgreSQL schema behind `store_config`. Failures are logged and
/// reported as `false` so the batch outcome is never lost.
pub async fn cleanup_store(store_config: &StoreConfig) -> bool {
    let StoreConfig::Postgres { url, schema } = store_config else {
        return true;
    };
    match store::drop_schema(url, schema).await {
        Ok(()) => {
            info!(schema = %schema, "Dropped store schema");
            true
        }
        Err(e) => {
            error!(schema = %schema, error = %e, "Failed to drop store schema");
            false
        }
    }
}
