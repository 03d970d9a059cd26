use axum::{
    extract::{Path, State},
    Extension, Json,
};
use foodmap_core::validate_postal_code;
use foodmap_store::PostalSummary;
use serde::Serialize;

use crate::jobs::JobSnapshot;
use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct PostalStatus {
    #[serde(flatten)]
    summary: PostalSummary,
    active_job: Option<JobSnapshot>,
}

pub(super) async fn postal_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(postal_code): Path<String>,
) -> Result<Json<ApiResponse<PostalStatus>>, ApiError> {
    validate_postal_code(&postal_code)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let summary = state
        .store
        .summary(&postal_code)
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    let active_job = state.jobs.active_for(&postal_code).await;

    Ok(Json(ApiResponse::new(
        PostalStatus {
            summary,
            active_job,
        },
        req_id.0,
    )))
}
