//! # Schedule API
//!
//! HTTP boundary for scheduling bike orders.
//!
//! | Route | Result |
//! |---|---|
//! | `POST /schedule` | `201 Created`, `Location: /schedule/{id}` |
//! | `POST /schedule/batch` | `200 OK` once every instance of the batch finished |
//! | `GET /schedule/:id` | `200 OK` with the instance status, `404` if unknown |
//! | `GET /health` | `200 OK` |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::bike::OrderGenerator;
use crate::client::{ClientError, InstanceStatus, OrchestrationClient};
use crate::error::{SchedulerError, ValidationError};
use crate::scheduler::{BatchRequest, BatchResult, BatchScheduler, SchedulerConfig};

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn OrchestrationClient>,
    pub generator: Arc<dyn OrderGenerator>,
    pub scheduler: SchedulerConfig,
    /// Cancelled on shutdown so in-flight batches stop pacing and waiting.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        client: Arc<dyn OrchestrationClient>,
        generator: Arc<dyn OrderGenerator>,
        scheduler: SchedulerConfig,
    ) -> Self {
        Self {
            client,
            generator,
            scheduler,
            shutdown: CancellationToken::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found")]
    NotFound,

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let body = json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        });
        (status_code, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Validation(message) => Self::bad_request(message),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchScheduleRequest {
    pub total_orchestrations: i64,
    pub interval_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct BatchScheduleResponse {
    pub message: String,
    pub result: BatchResult,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResponse {
    pub instance_id: String,
    pub runtime_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/schedule", post(schedule_one))
        .route("/schedule/batch", post(schedule_batch))
        .route("/schedule/:id", get(get_schedule))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Schedule a single orchestration for a freshly generated bike.
async fn schedule_one(
    State(state): State<AppState>,
    body: Option<Json<ScheduleRequest>>,
) -> ApiResult<Response> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let bike = state.generator.generate_order(request.model.as_deref());
    let id = Uuid::new_v4().to_string();
    let input = serde_json::to_string(&bike).map_err(|e| ApiError::internal(e.to_string()))?;

    let instance_id = state
        .client
        .schedule_instance(&state.scheduler.workflow_name, input, &id)
        .await
        .map_err(|e| {
            error!(schedule_id = %id, error = %e, "Error creating schedule");
            ApiError::from(e)
        })?;

    info!(schedule_id = %instance_id, model = %bike.model, "Created new schedule");

    let location = format!("/schedule/{instance_id}");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ScheduleResponse { id: instance_id }),
    )
        .into_response())
}

/// Run a whole paced batch and answer once every instance has been observed.
async fn schedule_batch(
    State(state): State<AppState>,
    body: Result<Json<BatchScheduleRequest>, JsonRejection>,
) -> ApiResult<Json<BatchScheduleResponse>> {
    let Json(body) = body?;
    let request = BatchRequest::with_max_total(
        body.total_orchestrations,
        body.interval_seconds,
        state.scheduler.max_batch_size,
    )?;

    let scheduler = BatchScheduler::new(
        state.client.clone(),
        state.generator.clone(),
        state.scheduler.clone(),
    );
    let result = scheduler.run(&request, &state.shutdown).await?;

    Ok(Json(BatchScheduleResponse {
        message: format!("All orchestrations finished: {}", result.summary()),
        result,
    }))
}

async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<InstanceResponse>> {
    let status = state.client.get_instance(&id).await.map_err(|e| {
        error!(schedule_id = %id, error = %e, "Error retrieving schedule");
        ApiError::from(e)
    })?;

    let runtime_status = status.runtime_status().to_string();
    let (output, failure_details) = match status {
        InstanceStatus::NotFound => return Err(ApiError::NotFound),
        InstanceStatus::Completed { output } => (Some(output), None),
        InstanceStatus::Failed { details } => (None, Some(details)),
        InstanceStatus::Unknown(_) => (None, None),
    };

    Ok(Json(InstanceResponse {
        instance_id: id,
        runtime_status,
        output,
        failure_details,
    }))
}
