//! Job management handlers.

use super::{SubmitJobRequest, SubmitJobResponse};
use crate::api::AppState;
use crate::error::{ApiError, Error};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /jobs - Submit a new download job
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 201, description = "Job submitted successfully", body = SubmitJobResponse),
        (status = 400, description = "Missing or invalid URL", body = ApiError)
    )
)]
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> Response {
    match state.downloader.submit_job(&request.url, request.options) {
        Ok(job_id) => (
            StatusCode::CREATED,
            Json(SubmitJobResponse {
                job_id,
                message: "download job started".to_string(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /jobs - List all jobs, newest first
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "All known jobs, newest first", body = Vec<crate::types::JobSnapshot>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloader.list_jobs())
}

/// GET /jobs/:id - Get one job's status snapshot
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status snapshot", body = crate::types::JobSnapshot),
        (status = 404, description = "Job not found", body = ApiError)
    )
)]
pub async fn get_job(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.downloader.job_snapshot(crate::types::JobId::new(id)) {
        Some(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        None => Error::NotFound(format!("job {id}")).into_response(),
    }
}

/// DELETE /jobs/:id - Clear a terminal job from the registry
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = i64, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job cleared"),
        (status = 404, description = "Job not found", body = ApiError),
        (status = 409, description = "Job is still running", body = ApiError)
    )
)]
pub async fn clear_job(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.downloader.clear_job(crate::types::JobId::new(id)) {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "job cleared" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
