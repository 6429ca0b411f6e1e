use std::time::Duration;

use bike_client::{cleanup_store, run_batch, BatchRunConfig};
use crazybike::config::AppConfig;
use crazybike::store::StoreConfig;
use tokio_util::sync::CancellationToken;

fn in_memory_app() -> AppConfig {
    let mut app = AppConfig::from_lookup(|_| None).expect("default config");
    app.activity_delay = Duration::from_millis(10);
    app.wait_timeout = Duration::from_secs(30);
    app
}

#[tokio::test]
async fn batch_against_in_memory_store_completes_every_order() {
    let config = BatchRunConfig {
        total: 3,
        interval_secs: 0.05,
        app: in_memory_app(),
        embedded_worker: false,
        cleanup: false,
    };

    let result = run_batch(config, CancellationToken::new())
        .await
        .expect("batch should run");

    assert_eq!(result.total, 3);
    assert_eq!(result.completed, 3);
    assert_eq!(result.failed, 0);
    assert!(!result.cancelled);
}

#[tokio::test]
async fn negative_total_is_rejected_before_scheduling() {
    let config = BatchRunConfig {
        total: -2,
        interval_secs: 1.0,
        app: in_memory_app(),
        embedded_worker: true,
        cleanup: false,
    };

    let err = run_batch(config, CancellationToken::new())
        .await
        .expect_err("negative totals are invalid");
    assert!(err.to_string().contains("totalOrchestrations"));
}

#[tokio::test]
async fn unsupported_store_is_a_configuration_error() {
    let mut app = in_memory_app();
    app.store_url = "redis://localhost".to_string();
    let config = BatchRunConfig {
        total: 1,
        interval_secs: 0.0,
        app,
        embedded_worker: true,
        cleanup: false,
    };

    assert!(run_batch(config, CancellationToken::new()).await.is_err());
}

#[tokio::test]
async fn oversized_batch_respects_configured_limit() {
    let mut app = in_memory_app();
    app.max_batch_size = 2;
    let config = BatchRunConfig {
        total: 3,
        interval_secs: 0.0,
        app,
        embedded_worker: true,
        cleanup: false,
    };

    let err = run_batch(config, CancellationToken::new())
        .await
        .expect_err("batch exceeds the configured maximum");
    assert!(err.to_string().contains("at most 2"));
}

#[tokio::test]
async fn cleanup_failure_is_reported_not_raised() {
    assert!(cleanup_store(&StoreConfig::SqliteMemory).await);

    let unsafe_schema = StoreConfig::Postgres {
        url: "postgres://localhost/never".to_string(),
        schema: "x; DROP TABLE y".to_string(),
    };
    assert!(!cleanup_store(&unsafe_schema).await);
}
