//! HTTP routes and handlers

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ecosort_core::ClassificationResult;
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};

use crate::relay::{generate_request_id, AppState};
use crate::upload::{self, UploadError};

pub fn create_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.upload.max_upload_bytes;

    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/analyze", post(analyze))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn liveness() -> &'static str {
    "EcoSort relay is live"
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// Successful `/analyze` envelope
#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    ok: bool,
    result: ClassificationResult,
}

/// Classify an uploaded image
async fn analyze(State(state): State<AppState>, request: Request) -> Result<Response, AppError> {
    let request_id = generate_request_id();
    let span = info_span!("analyze", request_id = %request_id);

    async move {
        metrics::counter!("ecosort_requests_total").increment(1);

        let image = upload::read_image(state.config.upload.mode, request).await?;
        info!("Received {} bytes ({})", image.len(), image.mime_type());

        let result = state.classifier.classify(image).await?;
        info!(label = %result.label, confidence = ?result.confidence, "Classification complete");

        Ok::<_, AppError>(Json(AnalyzeResponse { ok: true, result }).into_response())
    }
    .instrument(span)
    .await
}

async fn fallback() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

/// Error handling
#[derive(Debug)]
enum AppError {
    NoImageData,
    PayloadTooLarge,
    InvalidRequest(String),
    ClassificationFailed(String),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NoImage => AppError::NoImageData,
            UploadError::TooLarge => AppError::PayloadTooLarge,
            UploadError::Malformed(msg) => AppError::InvalidRequest(msg),
        }
    }
}

impl From<ecosort_core::Error> for AppError {
    fn from(err: ecosort_core::Error) -> Self {
        if err.is_client_error() {
            AppError::NoImageData
        } else {
            AppError::ClassificationFailed(err.to_string())
        }
    }
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::NoImageData => "no_image",
            AppError::PayloadTooLarge => "too_large",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::ClassificationFailed(_) => "classification",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        metrics::counter!("ecosort_errors_total", "kind" => self.kind()).increment(1);

        let (status, message) = match self {
            AppError::NoImageData => (StatusCode::BAD_REQUEST, "no image data".to_string()),
            AppError::PayloadTooLarge => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload too large".to_string())
            }
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ClassificationFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
