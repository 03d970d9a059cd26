mod jobs;
mod search;
mod status;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use foodmap_store::JsonStore;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::jobs::{JobRegistry, JobRunner};
use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobRegistry,
    pub runner: Arc<dyn JobRunner>,
    pub store: JsonStore,
    pub started_at: Instant,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_store_error(request_id: String, error: &foodmap_store::StoreError) -> ApiError {
    tracing::error!(error = %error, "output file access failed");
    ApiError::new(request_id, "internal_error", "output files could not be read")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/search", post(search::search))
        .route("/scrape", post(jobs::start_scrape))
        .route("/jobs", get(jobs::list_jobs))
        .route("/job/{job_id}", get(jobs::get_job))
        .route("/stop/{job_id}", post(jobs::stop_job))
        .route("/status/{postal_code}", get(status::postal_status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Endpoint {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    endpoints: Vec<Endpoint>,
}

const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/health", "service health and active job count"),
    ("POST", "/search", "run only the postal-code search"),
    ("POST", "/scrape", "start a background scrape job"),
    ("GET", "/jobs", "list known jobs"),
    ("GET", "/job/{job_id}", "status and progress of one job"),
    ("POST", "/stop/{job_id}", "ask a running job to stop"),
    ("GET", "/status/{postal_code}", "what is saved for a postal code"),
];

async fn index(Extension(req_id): Extension<RequestId>) -> Json<ApiResponse<ServiceInfo>> {
    let endpoints = ENDPOINTS
        .iter()
        .map(|&(method, path, description)| Endpoint {
            method,
            path,
            description,
        })
        .collect();
    Json(ApiResponse::new(
        ServiceInfo {
            service: "foodmap",
            version: env!("CARGO_PKG_VERSION"),
            endpoints,
        },
        req_id.0,
    ))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    service: &'static str,
    active_jobs: usize,
    uptime_minutes: u64,
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::new(
        HealthData {
            status: "ok",
            service: "foodmap",
            active_jobs: state.jobs.active_count().await,
            uptime_minutes: state.started_at.elapsed().as_secs() / 60,
        },
        req_id.0,
    ))
}
