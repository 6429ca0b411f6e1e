use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use crazybike::client::{ClientError, InstanceStatus, OrchestrationClient};
use crazybike::orchestration::{start_runtime, WorkerOptions};
use crazybike::store::{self, StoreConfig};
use duroxide::providers::Provider;
use duroxide::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

#[allow(dead_code)]
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Ignore failures: duroxide or another test binary may have installed one already
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_test_writer()
            .try_init();
    });
}

#[allow(dead_code)]
pub fn get_database_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").ok()
}

#[allow(dead_code)]
pub fn next_schema_name() -> String {
    let guid = uuid::Uuid::new_v4().to_string();
    let suffix = &guid[guid.len() - 8..]; // Last 8 characters
    format!("bike_test_{suffix}")
}

/// Worker options with fast activities and polling for tests.
#[allow(dead_code)]
pub fn fast_worker() -> WorkerOptions {
    WorkerOptions {
        activity_delay: Duration::from_millis(10),
        dispatcher_poll_interval: Some(Duration::from_millis(10)),
    }
}

/// In-memory SQLite store with a running bike worker.
#[allow(dead_code)]
pub async fn start_sqlite_worker() -> (Arc<dyn Provider>, Arc<Runtime>) {
    let store = store::connect(&StoreConfig::SqliteMemory)
        .await
        .expect("Failed to create in-memory SQLite store");
    let runtime = start_runtime(store.clone(), &fast_worker()).await;
    (store, runtime)
}

/// In-memory SQLite store with nothing processing its orchestrations.
#[allow(dead_code)]
pub async fn sqlite_store_without_worker() -> Arc<dyn Provider> {
    store::connect(&StoreConfig::SqliteMemory)
        .await
        .expect("Failed to create in-memory SQLite store")
}

#[allow(dead_code)]
pub async fn cleanup_schema(database_url: &str, schema_name: &str) {
    store::drop_schema(database_url, schema_name)
        .await
        .expect("Failed to drop test schema");
}

/// In-memory [`OrchestrationClient`] with scripted per-instance statuses.
///
/// Scheduled instances complete with `"shipped"` unless a status was scripted
/// for them; unknown ids report `NotFound`.
#[derive(Default)]
#[allow(dead_code)]
pub struct StubClient {
    pub scheduled: Mutex<Vec<(String, String, String)>>,
    statuses: Mutex<HashMap<String, InstanceStatus>>,
    reject_with: Mutex<Option<ClientError>>,
}

#[allow(dead_code)]
impl StubClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, instance_id: &str, status: InstanceStatus) {
        self.statuses
            .lock()
            .unwrap()
            .insert(instance_id.to_string(), status);
    }

    pub fn reject_schedules_with(&self, err: ClientError) {
        *self.reject_with.lock().unwrap() = Some(err);
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }
}

#[async_trait]
impl OrchestrationClient for StubClient {
    async fn schedule_instance(
        &self,
        workflow_name: &str,
        input: String,
        instance_id: &str,
    ) -> Result<String, ClientError> {
        if let Some(err) = self.reject_with.lock().unwrap().clone() {
            return Err(err);
        }
        self.scheduled.lock().unwrap().push((
            workflow_name.to_string(),
            input,
            instance_id.to_string(),
        ));
        Ok(instance_id.to_string())
    }

    async fn wait_for_completion(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> Result<InstanceStatus, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled(instance_id.to_string()));
        }
        self.get_instance(instance_id).await
    }

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceStatus, ClientError> {
        if let Some(status) = self.statuses.lock().unwrap().get(instance_id) {
            return Ok(status.clone());
        }
        let known = self
            .scheduled
            .lock()
            .unwrap()
            .iter()
            .any(|(_, _, id)| id == instance_id);
        if known {
            Ok(InstanceStatus::Completed {
                output: "shipped".to_string(),
            })
        } else {
            Ok(InstanceStatus::NotFound)
        }
    }
}
