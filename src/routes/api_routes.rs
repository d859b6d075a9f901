use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ChatRequest;
use crate::service::chat_service::ChatService;

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST `/chat` — `{"query"}` in, `{"answer", "sources"}` out
pub async fn chat_handler(
    State(svc): State<ChatService>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    async move {
        info!("Answering query ({} chars)", request.query.chars().count());
        match svc.chat(request).await {
            Ok(response) => {
                info!("Answered with {} source(s)", response.sources.len());
                Json(response).into_response()
            }
            Err(err) => error_response(&err),
        }
    }
    .instrument(span)
    .await
}

/// GET `/health` — liveness probe
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ── Helper ────────────────────────────────────────────────────────────────────

fn error_status(err: &AppError) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_llm_unavailable() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(err: &AppError) -> Response {
    let status = error_status(err);
    if status.is_server_error() {
        error!("Chat request failed: {err}");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
