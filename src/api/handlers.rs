//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};
use super::{AppState, PredictState};
use crate::handler::ResponseBody;
use axum::{
    body::Bytes,
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the gateway router
pub fn create_gateway_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(gateway_health))
        .route("/version", get(get_version))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the predict service router
pub fn create_predict_router(state: PredictState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(predict_health))
        .route("/version", get(get_version))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Browser clients call the gateway cross-origin
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::OPTIONS, Method::POST, Method::GET])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static("x-amz-date"),
            AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-amz-security-token"),
        ])
}

// ============================================================
// Chat
// ============================================================

async fn chat(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<ResponseBody>) {
    let outcome = state.handler.handle(&body).await;
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome.into_body()))
}

async fn gateway_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state
            .handler
            .selected_backend()
            .map(crate::backend::BackendKind::display_name),
    })
}

// ============================================================
// Predict
// ============================================================

async fn predict(
    State(state): State<PredictState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    let request: PredictRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?;

    let prompt = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("text field is required".to_string()))?;

    let reply = state.backend.generate_from_prompt(&prompt).await;
    Ok(Json(PredictResponse { answer: reply.text }))
}

async fn predict_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: Some(crate::backend::BackendKind::LocalPipeline.display_name()),
    })
}

async fn get_version() -> &'static str {
    concat!("chat-gateway ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
