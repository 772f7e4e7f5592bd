use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use glassdesk_whatsapp::{
    verify_subscription, EventContext, EventDispatcher, VerificationError, WebhookPayload,
};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookState {
    dispatcher: Arc<EventDispatcher>,
    verify_token: Option<SecretString>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

pub fn router(dispatcher: Arc<EventDispatcher>, verify_token: Option<SecretString>) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .with_state(WebhookState { dispatcher, verify_token })
}

async fn verify(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> (StatusCode, String) {
    match verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        state.verify_token.as_ref(),
    ) {
        Ok(challenge) => {
            info!(
                event_name = "whatsapp.webhook.verified",
                correlation_id = "verification",
                session_key = "unknown",
                "webhook subscription verified"
            );
            (StatusCode::OK, challenge)
        }
        Err(error @ VerificationError::MissingParameters) => {
            (StatusCode::BAD_REQUEST, error.to_string())
        }
        Err(error @ VerificationError::TokenMismatch) => {
            warn!(
                event_name = "whatsapp.webhook.verification_failed",
                correlation_id = "verification",
                session_key = "unknown",
                "webhook verification token rejected"
            );
            (StatusCode::FORBIDDEN, error.to_string())
        }
    }
}

/// Always answers 200; the platform retries anything else.
async fn receive(State(state): State<WebhookState>, body: Bytes) -> StatusCode {
    let ctx = EventContext::new(Uuid::new_v4().to_string());

    let payload = match serde_json::from_slice::<WebhookPayload>(&body) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(
                event_name = "whatsapp.webhook.invalid_payload",
                correlation_id = %ctx.correlation_id,
                session_key = "unknown",
                error = %error,
                "ignoring undecodable webhook payload"
            );
            return StatusCode::OK;
        }
    };

    let events = payload.events();
    let results = state.dispatcher.dispatch_all(&events, &ctx).await;
    debug!(
        event_name = "whatsapp.webhook.processed",
        correlation_id = %ctx.correlation_id,
        session_key = "unknown",
        events = events.len(),
        handled = results.len(),
        "webhook payload processed"
    );

    StatusCode::OK
}
