use std::path::PathBuf;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use foodmap_core::RunConfig;
use serde::Serialize;

use crate::jobs::{JobSnapshot, JobStatus, StartError};
use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ScrapeAccepted {
    success: bool,
    job_id: String,
    message: String,
    status_url: String,
}

/// Counts currently on disk for the job's postal code.
#[derive(Debug, Serialize)]
pub(super) struct SavedCounts {
    restaurants: usize,
    stores: usize,
    restaurants_file: PathBuf,
    stores_file: PathBuf,
}

#[derive(Debug, Serialize)]
pub(super) struct JobDetail {
    #[serde(flatten)]
    job: JobSnapshot,
    saved: Option<SavedCounts>,
}

#[derive(Debug, Serialize)]
pub(super) struct StopResponse {
    job_id: String,
    status: JobStatus,
    message: String,
}

pub(super) async fn start_scrape(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<RunConfig>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ScrapeAccepted>>), ApiError> {
    let Json(run) = payload
        .map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;
    run.validate()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let postal_code = run.postal_code.clone();
    let job_id = state
        .jobs
        .start(run, state.runner.clone())
        .await
        .map_err(|e| match e {
            StartError::AlreadyRunning { job_id } => ApiError::new(
                req_id.0.clone(),
                "conflict",
                format!("job {job_id} is already running for postal code {postal_code}"),
            ),
        })?;

    let accepted = ScrapeAccepted {
        success: true,
        message: format!("scrape started for postal code {postal_code}"),
        status_url: format!("/job/{job_id}"),
        job_id,
    };
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(accepted, req_id.0)),
    ))
}

pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<String>,
) -> Result<Json<ApiResponse<JobDetail>>, ApiError> {
    let Some(job) = state.jobs.get(&job_id).await else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("job {job_id} not found"),
        ));
    };

    let saved = match state.store.summary(&job.postal_code) {
        Ok(summary) => Some(SavedCounts {
            restaurants: summary.restaurants.establishments,
            stores: summary.stores.establishments,
            restaurants_file: summary.restaurants.file,
            stores_file: summary.stores.file,
        }),
        Err(e) => {
            tracing::warn!(job_id, error = %e, "could not read saved counts");
            None
        }
    };

    Ok(Json(ApiResponse::new(JobDetail { job, saved }, req_id.0)))
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<JobSnapshot>>> {
    Json(ApiResponse::new(state.jobs.list().await, req_id.0))
}

pub(super) async fn stop_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<String>,
) -> Result<Json<ApiResponse<StopResponse>>, ApiError> {
    let Some(status) = state.jobs.stop(&job_id).await else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("job {job_id} not found"),
        ));
    };

    let message = if status.is_finished() {
        format!("job already {status}")
    } else {
        "stop requested; the job ends after the current establishment".to_string()
    };
    Ok(Json(ApiResponse::new(
        StopResponse {
            job_id,
            status,
            message,
        },
        req_id.0,
    )))
}
