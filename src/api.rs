use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::job::{Job, JobId, Payload};
use crate::queue::JobQueue;
use crate::storage::Storage;

#[derive(Clone)]
struct ApiState {
    storage: Arc<dyn Storage>,
    queue: JobQueue,
}

pub(crate) fn router(storage: Arc<dyn Storage>, queue: JobQueue) -> Router {
    let state = ApiState { storage, queue };

    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateJobRequest {
    #[serde(rename = "type")]
    job_type: String,
    #[serde(default)]
    payload: Payload,
}

/// POST /jobs: persist a new job and enqueue it for processing.
///
/// Responds once the identifier is on the queue, so queue backpressure
/// propagates to the submitter.
async fn create_job(State(state): State<ApiState>, Json(req): Json<CreateJobRequest>) -> Response {
    if req.job_type.is_empty() || req.payload.is_empty() {
        return (StatusCode::BAD_REQUEST, "Type and payload are required").into_response();
    }

    let job = Job::new(req.job_type, req.payload);
    if let Err(e) = state.storage.insert(&job).await {
        error!(error = %e, "Failed to insert job");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create job").into_response();
    }

    if let Err(e) = state.queue.enqueue(job.id.clone()).await {
        error!(job_id = %job.id, error = %e, "Failed to enqueue job");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to enqueue job").into_response();
    }

    (StatusCode::CREATED, Json(job)).into_response()
}

async fn get_job(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.storage.find_by_id(&JobId(id)).await {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Job not found").into_response(),
        Err(e) => {
            error!(error = %e, "Failed to find job");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve job").into_response()
        }
    }
}

async fn list_jobs(State(state): State<ApiState>) -> Response {
    match state.storage.list_recent(50).await {
        Ok(jobs) => Json(jobs).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to query jobs");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to retrieve jobs").into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy"}))
}
