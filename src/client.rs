//! Narrow client interface to the durable orchestration backend.
//!
//! The scheduler and the HTTP boundary only talk to [`OrchestrationClient`];
//! [`DuroxideClient`] is the production implementation on top of
//! `duroxide::Client`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use duroxide::providers::Provider;
use duroxide::runtime::OrchestrationStatus;
use duroxide::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Status of one orchestration instance as seen by this application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceStatus {
    Completed { output: String },
    Failed { details: String },
    NotFound,
    /// Any non-terminal or unrecognised state, carrying the backend's rendering.
    Unknown(String),
}

impl InstanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    pub fn runtime_status(&self) -> &str {
        match self {
            Self::Completed { .. } => "Completed",
            Self::Failed { .. } => "Failed",
            Self::NotFound => "NotFound",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.runtime_status())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("rejected by orchestration backend: {0}")]
    Validation(String),

    #[error("orchestration backend error: {0}")]
    Backend(String),

    #[error("timed out after {timeout:?} waiting for {instance_id}")]
    Timeout {
        instance_id: String,
        timeout: Duration,
    },

    #[error("wait for {0} was cancelled")]
    Cancelled(String),
}

#[async_trait]
pub trait OrchestrationClient: Send + Sync {
    /// Create a new orchestration instance and return its id.
    async fn schedule_instance(
        &self,
        workflow_name: &str,
        input: String,
        instance_id: &str,
    ) -> Result<String, ClientError>;

    /// Block until the instance reaches a terminal status, fails, or `cancel` fires.
    async fn wait_for_completion(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> Result<InstanceStatus, ClientError>;

    /// Point lookup of the current status.
    async fn get_instance(&self, instance_id: &str) -> Result<InstanceStatus, ClientError>;
}

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// [`OrchestrationClient`] backed by a Duroxide store.
#[derive(Clone)]
pub struct DuroxideClient {
    client: Arc<Client>,
    wait_timeout: Duration,
}

impl DuroxideClient {
    pub fn new(store: Arc<dyn Provider>) -> Self {
        Self {
            client: Arc::new(Client::new(store)),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }
}

fn map_status(status: OrchestrationStatus) -> InstanceStatus {
    match status {
        OrchestrationStatus::Completed { output, .. } => InstanceStatus::Completed { output },
        OrchestrationStatus::Failed { details, .. } => InstanceStatus::Failed {
            details: details.display_message(),
        },
        OrchestrationStatus::NotFound => InstanceStatus::NotFound,
        other => InstanceStatus::Unknown(status_name(&other)),
    }
}

/// Variant name of a backend status, without its payload.
fn status_name(status: &OrchestrationStatus) -> String {
    let raw = format!("{status:?}");
    raw.split(|c: char| !c.is_alphanumeric())
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

#[async_trait]
impl OrchestrationClient for DuroxideClient {
    async fn schedule_instance(
        &self,
        workflow_name: &str,
        input: String,
        instance_id: &str,
    ) -> Result<String, ClientError> {
        if instance_id.trim().is_empty() {
            return Err(ClientError::Validation("instance id must not be empty".into()));
        }
        if workflow_name.trim().is_empty() {
            return Err(ClientError::Validation("workflow name must not be empty".into()));
        }

        self.client
            .start_orchestration(instance_id, workflow_name, input)
            .await
            .map_err(|e| match e {
                duroxide::ClientError::InvalidInput { message } => ClientError::Validation(message),
                other => ClientError::Backend(other.to_string()),
            })?;

        debug!(instance_id, workflow_name, "orchestration instance started");
        Ok(instance_id.to_string())
    }

    async fn wait_for_completion(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> Result<InstanceStatus, ClientError> {
        let wait = self
            .client
            .wait_for_orchestration(instance_id, self.wait_timeout);

        tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled(instance_id.to_string())),
            result = wait => match result {
                Ok(status) => Ok(map_status(status)),
                Err(duroxide::ClientError::Timeout) => Err(ClientError::Timeout {
                    instance_id: instance_id.to_string(),
                    timeout: self.wait_timeout,
                }),
                Err(e) => Err(ClientError::Backend(e.to_string())),
            },
        }
    }

    async fn get_instance(&self, instance_id: &str) -> Result<InstanceStatus, ClientError> {
        self.client
            .get_orchestration_status(instance_id)
            .await
            .map(map_status)
            .map_err(|e| ClientError::Backend(e.to_string()))
    }
}
