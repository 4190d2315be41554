//! HTTP surface over the coordinator.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::coordinator::Coordinator;
use crate::error::StoreError;
use crate::sync::protocol::{DownloadParams, RegisterRequest, UploadRequest};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(register))
        .route("/api/sync", get(download).post(upload))
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state
        .coordinator
        .register(request.client_id.as_deref(), request.client_name.as_deref(), Utc::now())
        .await?;
    Ok(Json(resp))
}

async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state
        .coordinator
        .download(params.since, params.client_id.as_deref(), Utc::now())
        .await?;
    Ok(Json(resp))
}

async fn upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = state.coordinator.upload(&request, Utc::now()).await?;
    Ok(Json(resp))
}

async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let resp = state.coordinator.status(Utc::now()).await?;
    Ok(Json(resp))
}
