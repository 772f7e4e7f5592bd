//! Web chat JSON API.
//!
//! - `POST /api/v1/chat` `{user_id, message}` → `{reply, state}`
//! - `POST /api/v1/chat/reset` `{user_id}` → `{reply, state}`
//! - `GET /api/v1/chat/history?user_id=` → ordered history

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use glassdesk_agent::ActionOrchestrator;
use glassdesk_core::domain::session::{Channel, ChatMessage, SessionState};
use glassdesk_core::errors::{ApplicationError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    orchestrator: Arc<ActionOrchestrator>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResetRequest {
    pub user_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub state: SessionState,
}

#[derive(Clone, Debug, Serialize)]
pub struct HistoryResponse {
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    correlation_id: String,
}

/// Interface error rendered with its user-safe message.
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self(InterfaceError::BadRequest {
            message: message.to_string(),
            correlation_id: Uuid::new_v4().to_string(),
        })
    }

    fn from_application(error: ApplicationError, session_key: &str) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            event_name = "server.chat.failed",
            correlation_id = %correlation_id,
            session_key = %session_key,
            error = %error,
            "chat request failed"
        );
        Self(error.into_interface(correlation_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(orchestrator: Arc<ActionOrchestrator>) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/chat/reset", post(reset))
        .route("/api/v1/chat/history", get(history))
        .with_state(ChatState { orchestrator })
}

async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = required(&request.user_id, "user_id is required")?;
    let message = required(&request.message, "message is required")?;

    let turn = state
        .orchestrator
        .converse(message, Channel::Web, user_id)
        .await
        .map_err(|error| ApiError::from_application(error, &session_key(user_id)))?;

    Ok(Json(ChatResponse { reply: turn.reply, state: turn.state }))
}

async fn reset(
    State(state): State<ChatState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = required(&request.user_id, "user_id is required")?;

    let reply = state
        .orchestrator
        .reset_session(Channel::Web, user_id)
        .await
        .map_err(|error| ApiError::from_application(error, &session_key(user_id)))?;

    Ok(Json(ChatResponse { reply, state: SessionState::AwaitingIdentifier }))
}

async fn history(
    State(state): State<ChatState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let user_id = required(&query.user_id, "user_id is required")?;

    let messages = state
        .orchestrator
        .history(Channel::Web, user_id)
        .await
        .map_err(|error| ApiError::from_application(error, &session_key(user_id)))?;

    Ok(Json(HistoryResponse { user_id: user_id.to_string(), messages }))
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ApiError::bad_request(message))
    } else {
        Ok(trimmed)
    }
}

fn session_key(user_id: &str) -> String {
    format!("session:{}:{user_id}", Channel::Web)
}
