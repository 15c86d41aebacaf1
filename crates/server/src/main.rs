//! AgriSight REST API server

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use cloud_bridge::{smart_analyzer, CloudConfig};
use diagnosis_core::config::parse_or;
use diagnosis_core::{
    ClassificationResult, DiagnosisConfig, ImageInput, LocalClassifier, ModelStatus,
    SmartAnalyzer,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// Request body cap; base64 inflates a photo by a third
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

struct AppState {
    analyzer: SmartAnalyzer,
    local: Arc<LocalClassifier>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = DiagnosisConfig::from_env();
    let local = Arc::new(LocalClassifier::new(&config.model_dir));
    // Requests served before this finishes get an empty local result
    let _ = local.spawn_load();

    let analyzer = smart_analyzer(Arc::clone(&local), &config, CloudConfig::from_env())?;
    let state = Arc::new(AppState { analyzer, local });

    let addr = std::env::var("AGRISIGHT_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let body_limit = parse_or(
        "AGRISIGHT_MAX_BODY_BYTES",
        |key| std::env::var(key).ok(),
        DEFAULT_MAX_BODY_BYTES,
    );
    tracing::info!("Server listening on {} (body limit {} bytes)", addr, body_limit);

    axum::serve(listener, app(state, body_limit))
        .await
        .context("Server terminated")?;
    Ok(())
}

fn app(state: Arc<AppState>, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/model", get(model_status))
        .route("/api/diagnose", post(diagnose))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn model_status(State(state): State<Arc<AppState>>) -> Json<ModelStatus> {
    Json(state.local.status().await)
}

async fn diagnose(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DiagnoseRequest>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let base64 = strip_data_url(&request.image).trim().to_string();
    let bytes = general_purpose::STANDARD
        .decode(&base64)
        .map_err(|e| ApiError::bad_request(format!("image is not valid base64: {}", e)))?;

    let span = tracing::info_span!("diagnose", request_id = %uuid::Uuid::new_v4());
    let result = state
        .analyzer
        .analyze(&ImageInput::new(bytes, base64))
        .instrument(span)
        .await;
    Ok(Json(result))
}

/// Drop a `data:<mime>;base64,` prefix as produced by browser file readers
fn strip_data_url(image: &str) -> &str {
    match image.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map_or(rest, |(_, data)| data),
        None => image,
    }
}

#[derive(Deserialize)]
struct DiagnoseRequest {
    /// Base64 image, optionally as a data URL
    image: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
