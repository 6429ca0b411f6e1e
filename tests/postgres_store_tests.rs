//! Runs against a real PostgreSQL server. Set `DATABASE_URL` (or put it in
//! `.env`) and run with `cargo test -- --ignored`.

use std::sync::Arc;

use crazybike::bike::BikeFactory;
use crazybike::client::DuroxideClient;
use crazybike::orchestration::start_runtime;
use crazybike::scheduler::{BatchRequest, BatchScheduler, SchedulerConfig};
use crazybike::store::{self, StoreConfig};
use tokio_util::sync::CancellationToken;

mod common;

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn batch_runs_on_postgres_store() {
    common::init_test_logging();
    let database_url = common::get_database_url().expect("DATABASE_URL must be set");
    let schema_name = common::next_schema_name();

    let config = StoreConfig::from_url(&database_url, Some(&schema_name)).unwrap();
    assert!(config.is_shared());
    let provider = store::connect(&config)
        .await
        .expect("Failed to create PostgreSQL store");
    let runtime = start_runtime(provider.clone(), &common::fast_worker()).await;

    let scheduler = BatchScheduler::new(
        Arc::new(DuroxideClient::new(provider)),
        Arc::new(BikeFactory::new()),
        SchedulerConfig::default(),
    );
    let result = scheduler
        .run(&BatchRequest::new(2, 0.1).unwrap(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.completed, 2);
    assert_eq!(result.failed, 0);

    runtime.shutdown(None).await;
    common::cleanup_schema(&database_url, &schema_name).await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn drop_schema_is_idempotent() {
    let database_url = common::get_database_url().expect("DATABASE_URL must be set");
    let schema_name = common::next_schema_name();

    store::drop_schema(&database_url, &schema_name).await.unwrap();
    store::drop_schema(&database_url, &schema_name).await.unwrap();
}

#[tokio::test]
async fn drop_schema_refuses_unsafe_names() {
    let err = store::drop_schema("postgres://localhost/never", "x; DROP TABLE y")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid name"));
}
