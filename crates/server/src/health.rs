use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use glassdesk_core::domain::session::Channel;
use glassdesk_db::SessionStore;
use serde::Serialize;

const PROBE_USER_ID: &str = "__health_probe__";

#[derive(Clone)]
pub struct HealthState {
    store: SessionStore,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub session_store: HealthCheck,
    pub checked_at: String,
}

pub fn router(store: SessionStore) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let session_store = session_store_check(&state.store).await;
    let ready = session_store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "glassdesk-server runtime initialized".to_string(),
        },
        session_store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn session_store_check(store: &SessionStore) -> HealthCheck {
    match store.get(Channel::Web, PROBE_USER_ID).await {
        Ok(_) => {
            HealthCheck { status: "ready", detail: "session store read succeeded".to_string() }
        }
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("session store read failed: {error}"),
        },
    }
}
