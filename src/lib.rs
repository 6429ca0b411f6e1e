//! # Crazy Bike Shop
//!
//! Schedules bike-order workflows on [Duroxide](https://crates.io/crates/duroxide).
//! Each order runs the `CrazyBikeOrchestration`, which calls the `AssembleBike`
//! and `ShipBike` activities in sequence.
//!
//! The interesting piece is the [`scheduler::BatchScheduler`]: it creates many
//! orchestration instances spaced by a fixed interval, then waits for every
//! one of them and tallies completed versus failed instances.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use crazybike::bike::BikeFactory;
//! use crazybike::client::DuroxideClient;
//! use crazybike::orchestration::{start_runtime, WorkerOptions};
//! use crazybike::scheduler::{BatchRequest, BatchScheduler, SchedulerConfig};
//! use crazybike::store::{self, StoreConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = store::connect(&StoreConfig::SqliteMemory).await?;
//!     let runtime = start_runtime(store.clone(), &WorkerOptions::default()).await;
//!
//!     let scheduler = BatchScheduler::new(
//!         Arc::new(DuroxideClient::new(store)),
//!         Arc::new(BikeFactory::new()),
//!         SchedulerConfig::default(),
//!     );
//!     let request = BatchRequest::new(10, 5.0)?;
//!     let result = scheduler.run(&request, &CancellationToken::new()).await?;
//!     println!("{}", result.summary());
//!
//!     runtime.shutdown(None).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! | Environment Variable | Description | Default |
//! |---------------------|-------------|---------|
//! | `BIKE_STORE_URL` (or `DATABASE_URL`) | `sqlite::memory:` or a PostgreSQL URL | `sqlite::memory:` |
//! | `BIKE_STORE_SCHEMA` | PostgreSQL schema for the store | `crazybike` |
//! | `BIKE_ACTIVITY_DELAY_MS` | Simulated work time per activity | `5000` |
//! | `BIKE_WAIT_TIMEOUT_SECS` | Per-instance completion wait timeout | `3600` |
//! | `BIKE_API_ADDR` | HTTP bind address | `0.0.0.0:8080` |
//! | `BIKE_WAIT_CONCURRENCY` | Outstanding waits per batch (`1` = sequential) | `1` |
//! | `BIKE_UNEXPECTED_STATUS` | `skip` or `abort` on non-terminal statuses | `skip` |
//! | `BIKE_MAX_BATCH_SIZE` | Largest accepted batch | `10000` |

pub mod api;
pub mod bike;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestration;
pub mod scheduler;
pub mod store;

pub use client::{DuroxideClient, InstanceStatus, OrchestrationClient};
pub use scheduler::{BatchRequest, BatchResult, BatchScheduler};
