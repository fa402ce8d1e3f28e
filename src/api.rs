//! HTTP routes over a shared [`StudyAssistant`].
//!
//! - `GET /health` returns `{"status":"ok"}`
//! - `POST /chat` takes `{message, session_id?, style?}` and returns the structured response
//! - `DELETE /session/{session_id}` forgets a conversation and returns `{"ok":true}`
//!
//! Every assistant failure is a 500 with `{"error": <kind>, "message": <detail>}`.

use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assistant::StudyAssistant;
use crate::completion::StructuredResponse;
use crate::error::AssistantError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

pub struct ApiError(AssistantError);

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        tracing::error!(kind = %kind, error = %self.0, "request failed");
        let body = Json(ErrorBody {
            error: kind.to_string(),
            message: self.0.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub fn router(assistant: Arc<StudyAssistant>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/session/{session_id}", delete(reset_session))
        .with_state(assistant)
}

/// CORS for the configured origins. `"*"` allows any origin, without credentials.
pub fn cors_layer(allow_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allow_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allow_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

/// Routes plus the CORS and request tracing layers.
pub fn app(assistant: Arc<StudyAssistant>, allow_origins: &[String]) -> Router {
    router(assistant)
        .layer(cors_layer(allow_origins))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(
    State(assistant): State<Arc<StudyAssistant>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<StructuredResponse>, ApiError> {
    let session_id = req
        .session_id
        .as_deref()
        .unwrap_or(assistant.default_session());
    let style = req.style.as_deref().unwrap_or("short");

    let response = assistant.ask(&req.message, session_id, style).await?;
    Ok(Json(response))
}

async fn reset_session(
    State(assistant): State<Arc<StudyAssistant>>,
    Path(session_id): Path<String>,
) -> Json<serde_json::Value> {
    assistant.reset_session(&session_id);
    Json(serde_json::json!({ "ok": true }))
}
