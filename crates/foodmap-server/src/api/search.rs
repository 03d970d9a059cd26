use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use foodmap_core::{validate_postal_code, SearchReport};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchRequest {
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default, alias = "visible_mode")]
    visible: bool,
}

/// Opens the marketplace, submits the postal code and stops there. Runs
/// inline; the response waits for the browser.
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SearchReport>>, ApiError> {
    let Json(request) = payload
        .map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;
    let postal_code = request
        .postal_code
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            ApiError::new(req_id.0.clone(), "validation_error", "postal_code is required")
        })?;
    validate_postal_code(postal_code)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let report = state.runner.search(postal_code, request.visible).await;
    if !report.success {
        let message = report.error.unwrap_or_else(|| "search failed".to_string());
        tracing::warn!(postal_code, error = %message, "search request failed");
        return Err(ApiError::new(req_id.0, "search_failed", message));
    }
    Ok(Json(ApiResponse::new(report, req_id.0)))
}
