//! Paced batch scheduling of bike-order orchestrations.
//!
//! A batch run has two phases:
//!
//! 1. **Submission**: instances are created one at a time, in id-generation
//!    order, with a pacing pause between consecutive submissions. A failed
//!    submission is logged and the batch moves on.
//! 2. **Completion**: every accepted instance is waited on and classified.
//!    Waiting is sequential by default; [`WaitMode::Concurrent`] fans out with
//!    a bound on outstanding waits. The tally is the same either way.
//!
//! The run always yields a [`BatchResult`] unless the
//! [`UnexpectedStatusPolicy::Abort`] policy is selected and the backend
//! reports a non-terminal status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bike::{Bike, OrderGenerator};
use crate::client::{ClientError, InstanceStatus, OrchestrationClient};
use crate::error::{SchedulerError, ValidationError};
use crate::orchestration::CRAZY_BIKE_ORCHESTRATION;

/// How many instances to create and how far apart.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    total_instances: usize,
    interval: Duration,
}

/// Largest batch accepted unless configured otherwise.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

impl BatchRequest {
    /// Validate a request against [`DEFAULT_MAX_BATCH_SIZE`].
    pub fn new(total_instances: i64, interval_seconds: f64) -> Result<Self, ValidationError> {
        Self::with_max_total(total_instances, interval_seconds, DEFAULT_MAX_BATCH_SIZE)
    }

    pub fn with_max_total(
        total_instances: i64,
        interval_seconds: f64,
        max_total: usize,
    ) -> Result<Self, ValidationError> {
        let total = usize::try_from(total_instances)
            .map_err(|_| ValidationError::NegativeTotal(total_instances))?;
        if total > max_total {
            return Err(ValidationError::TooManyInstances {
                requested: total,
                max: max_total,
            });
        }
        if interval_seconds < 0.0 {
            return Err(ValidationError::InvalidInterval(interval_seconds));
        }
        // Rejects NaN, infinity and values past Duration::MAX
        let interval = Duration::try_from_secs_f64(interval_seconds)
            .map_err(|_| ValidationError::InvalidInterval(interval_seconds))?;
        Ok(Self {
            total_instances: total,
            interval,
        })
    }

    pub fn total_instances(&self) -> usize {
        self.total_instances
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// One unit of a batch. Instance ids are random UUIDs; uniqueness across
/// runs is assumed, not checked.
#[derive(Debug, Clone)]
pub struct WorkflowInstanceHandle {
    pub instance_id: String,
    pub payload: Bike,
}

/// Outcome counters for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    /// Rejected by the backend, or never submitted because the run was cancelled.
    pub not_scheduled: usize,
    pub wait_errors: usize,
    pub unexpected: usize,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn skipped(&self) -> usize {
        self.not_scheduled + self.wait_errors + self.unexpected
    }

    pub fn summary(&self) -> String {
        format!(
            "{} completed, {} failed, {} skipped, {} total orchestrations",
            self.completed,
            self.failed,
            self.skipped(),
            self.total
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Wait on instances one at a time, in submission order.
    Sequential,
    /// Wait on up to `max_in_flight` instances at once.
    Concurrent { max_in_flight: usize },
}

impl WaitMode {
    /// `0` and `1` mean sequential.
    pub fn from_concurrency(concurrency: usize) -> Self {
        if concurrency <= 1 {
            Self::Sequential
        } else {
            Self::Concurrent {
                max_in_flight: concurrency,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnexpectedStatusPolicy {
    /// Log the instance and count it as `unexpected`.
    Skip,
    /// Stop the run with [`SchedulerError::UnexpectedStatus`].
    Abort,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub workflow_name: String,
    pub wait_mode: WaitMode,
    pub unexpected_status: UnexpectedStatusPolicy,
    pub max_batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workflow_name: CRAZY_BIKE_ORCHESTRATION.to_string(),
            wait_mode: WaitMode::Sequential,
            unexpected_status: UnexpectedStatusPolicy::Skip,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Pacing pause was interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Spacing between consecutive submissions.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> Result<(), Interrupted>;
}

/// [`Pacer`] on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration, cancel: &CancellationToken) -> Result<(), Interrupted> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Interrupted),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

/// Classification of a single wait.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Completed,
    Failed,
    WaitError,
    Unexpected(InstanceStatus),
}

/// Accumulator folded over wait outcomes.
#[derive(Debug, Default, Clone, Copy)]
struct BatchTally {
    completed: usize,
    failed: usize,
    wait_errors: usize,
    unexpected: usize,
}

impl BatchTally {
    fn record(mut self, outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Completed => self.completed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::WaitError => self.wait_errors += 1,
            Outcome::Unexpected(_) => self.unexpected += 1,
        }
        self
    }
}

pub struct BatchScheduler {
    client: Arc<dyn OrchestrationClient>,
    generator: Arc<dyn OrderGenerator>,
    pacer: Arc<dyn Pacer>,
    config: SchedulerConfig,
}

impl BatchScheduler {
    pub fn new(
        client: Arc<dyn OrchestrationClient>,
        generator: Arc<dyn OrderGenerator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            client,
            generator,
            pacer: Arc::new(TokioPacer),
            config,
        }
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Generate one handle per unit of the batch.
    pub fn expand(&self, request: &BatchRequest) -> Vec<WorkflowInstanceHandle> {
        (0..request.total_instances())
            .map(|_| WorkflowInstanceHandle {
                instance_id: Uuid::new_v4().to_string(),
                payload: self.generator.generate_order(None),
            })
            .collect()
    }

    pub async fn run(
        &self,
        request: &BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, SchedulerError> {
        let handles = self.expand(request);
        let total = handles.len();

        info!(
            total,
            interval_secs = request.interval().as_secs_f64(),
            workflow = %self.config.workflow_name,
            "Starting paced batch scheduling"
        );

        let (submitted, cancelled) = self.submit_all(&handles, request.interval(), cancel).await;
        let not_scheduled = total - submitted.len();

        info!(
            scheduled = submitted.len(),
            not_scheduled,
            "All orchestrations scheduled. Waiting for completion..."
        );

        let tally = self.wait_all(&submitted, cancel).await?;

        let result = BatchResult {
            total,
            completed: tally.completed,
            failed: tally.failed,
            not_scheduled,
            wait_errors: tally.wait_errors,
            unexpected: tally.unexpected,
            cancelled: cancelled || cancel.is_cancelled(),
        };

        info!(
            completed = result.completed,
            failed = result.failed,
            skipped = result.skipped(),
            total = result.total,
            cancelled = result.cancelled,
            "FINAL RESULTS: {} completed, {} failed, {} total orchestrations",
            result.completed,
            result.failed,
            result.total
        );

        Ok(result)
    }

    /// Returns the ids the backend accepted, in submission order, and whether
    /// pacing was cut short by cancellation.
    async fn submit_all(
        &self,
        handles: &[WorkflowInstanceHandle],
        interval: Duration,
        cancel: &CancellationToken,
    ) -> (Vec<String>, bool) {
        let mut submitted = Vec::with_capacity(handles.len());

        for (index, handle) in handles.iter().enumerate() {
            let number = index + 1;
            info!(
                number,
                instance_id = %handle.instance_id,
                "Scheduling orchestration"
            );

            if self.submit(number, handle).await {
                submitted.push(handle.instance_id.clone());
            }

            let is_last = number == handles.len();
            if is_last || interval.is_zero() {
                continue;
            }

            info!(
                seconds = interval.as_secs_f64(),
                "Waiting before scheduling next orchestration"
            );
            if self.pacer.pause(interval, cancel).await.is_err() {
                warn!(
                    scheduled = submitted.len(),
                    remaining = handles.len() - number,
                    "Batch cancelled during pacing; remaining orchestrations will not be scheduled"
                );
                return (submitted, true);
            }
        }

        (submitted, false)
    }

    async fn submit(&self, number: usize, handle: &WorkflowInstanceHandle) -> bool {
        let input = match serde_json::to_string(&handle.payload) {
            Ok(input) => input,
            Err(e) => {
                error!(number, instance_id = %handle.instance_id, error = %e, "Error serializing order payload");
                return false;
            }
        };

        let started = Instant::now();
        match self
            .client
            .schedule_instance(&self.config.workflow_name, input, &handle.instance_id)
            .await
        {
            Ok(instance_id) => {
                info!(
                    number,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    instance_id = %instance_id,
                    "Orchestration scheduled"
                );
                true
            }
            Err(e) => {
                error!(number, instance_id = %handle.instance_id, error = %e, "Error scheduling orchestration");
                false
            }
        }
    }

    async fn wait_all(
        &self,
        instance_ids: &[String],
        cancel: &CancellationToken,
    ) -> Result<BatchTally, SchedulerError> {
        match self.config.wait_mode {
            WaitMode::Sequential => {
                let mut tally = BatchTally::default();
                for instance_id in instance_ids {
                    let outcome = self.wait_one(instance_id, cancel).await;
                    self.check_policy(instance_id, &outcome)?;
                    tally = tally.record(&outcome);
                }
                Ok(tally)
            }
            WaitMode::Concurrent { max_in_flight } => {
                let mut outcomes = stream::iter(instance_ids.iter().cloned())
                    .map(|instance_id| async move {
                        let outcome = self.wait_one(&instance_id, cancel).await;
                        (instance_id, outcome)
                    })
                    .buffered(max_in_flight.max(1));

                let mut tally = BatchTally::default();
                while let Some((instance_id, outcome)) = outcomes.next().await {
                    self.check_policy(&instance_id, &outcome)?;
                    tally = tally.record(&outcome);
                }
                Ok(tally)
            }
        }
    }

    async fn wait_one(&self, instance_id: &str, cancel: &CancellationToken) -> Outcome {
        match self.client.wait_for_completion(instance_id, cancel).await {
            Ok(InstanceStatus::Completed { .. }) => {
                info!(instance_id, "Orchestration completed successfully");
                Outcome::Completed
            }
            Ok(InstanceStatus::Failed { details }) => {
                error!(instance_id, error_message = %details, "Orchestration failed");
                Outcome::Failed
            }
            Ok(other) => {
                warn!(instance_id, status = %other, "Orchestration reported a non-terminal status");
                Outcome::Unexpected(other)
            }
            Err(ClientError::Cancelled(_)) => {
                warn!(instance_id, "Wait for orchestration cancelled");
                Outcome::WaitError
            }
            Err(e) => {
                error!(instance_id, error = %e, "Error waiting for orchestration completion");
                Outcome::WaitError
            }
        }
    }

    fn check_policy(&self, instance_id: &str, outcome: &Outcome) -> Result<(), SchedulerError> {
        match (outcome, self.config.unexpected_status) {
            (Outcome::Unexpected(status), UnexpectedStatusPolicy::Abort) => {
                Err(SchedulerError::UnexpectedStatus {
                    instance_id: instance_id.to_string(),
                    status: status.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
