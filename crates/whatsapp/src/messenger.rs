use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub const GRAPH_API_BASE_URL: &str = "https://graph.facebook.com";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("messenger request failed: {0}")]
    Request(String),
    #[error("messenger rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound delivery of a text reply to one recipient.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Returns whether the platform accepted the message.
    async fn send(&self, to: &str, text: &str) -> bool;
}

/// Sends through the WhatsApp Cloud API
/// (`{base}/{version}/{phone_number_id}/messages`).
#[derive(Clone)]
pub struct CloudApiMessenger {
    client: Client,
    endpoint: String,
    access_token: SecretString,
}

impl CloudApiMessenger {
    pub fn new(
        api_version: &str,
        phone_number_id: &str,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Self::with_base_url(GRAPH_API_BASE_URL, api_version, phone_number_id, access_token, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        api_version: &str,
        phone_number_id: &str,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TransportError::Request(error.to_string()))?;
        let endpoint = format!(
            "{}/{api_version}/{phone_number_id}/messages",
            base_url.trim_end_matches('/')
        );
        Ok(Self { client, endpoint, access_token })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn post_text(&self, to: &str, text: &str) -> Result<(), TransportError> {
        let body = OutboundText {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to,
            kind: "text",
            text: TextPayload { body: text },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for CloudApiMessenger {
    async fn send(&self, to: &str, text: &str) -> bool {
        match self.post_text(to, text).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "whatsapp.delivery.failed",
                    session_key = %format!("session:whatsapp:{to}"),
                    error = %error,
                    "whatsapp delivery failed"
                );
                false
            }
        }
    }
}

/// Stands in for the Cloud API when no credentials are configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOnlyMessenger;

#[async_trait]
impl Messenger for LogOnlyMessenger {
    async fn send(&self, to: &str, text: &str) -> bool {
        info!(
            event_name = "whatsapp.delivery.logged",
            session_key = %format!("session:whatsapp:{to}"),
            chars = text.chars().count(),
            "whatsapp delivery disabled, reply logged only"
        );
        true
    }
}

#[derive(Serialize)]
struct OutboundText<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextPayload<'a>,
}

#[derive(Serialize)]
struct TextPayload<'a> {
    body: &'a str,
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde_json::Value;

    use super::{CloudApiMessenger, LogOnlyMessenger, Messenger, TransportError};

    type Captured = Arc<Mutex<Vec<(String, String, Value)>>>;

    async fn spawn_graph(status: StatusCode) -> (String, Captured) {
        async fn messages(
            State((status, captured)): State<(StatusCode, Captured)>,
            Path((version, phone_id)): Path<(String, String)>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> StatusCode {
            let auth = headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if let Ok(mut captured) = captured.lock() {
                captured.push((format!("{version}/{phone_id}"), auth, body));
            }
            status
        }

        let captured: Captured = Arc::default();
        let app = Router::new()
            .route("/{version}/{phone_id}/messages", post(messages))
            .with_state((status, captured.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{address}"), captured)
    }

    fn messenger(base_url: &str) -> CloudApiMessenger {
        CloudApiMessenger::with_base_url(
            base_url,
            "v17.0",
            "1234567890",
            SecretString::from("EAAG-token".to_string()),
            Duration::from_secs(5),
        )
        .expect("messenger")
    }

    #[tokio::test]
    async fn posts_text_message_to_cloud_api() {
        let (base_url, captured) = spawn_graph(StatusCode::OK).await;

        assert!(messenger(&base_url).send("5511987654321", "Olá!").await);

        let captured = captured.lock().expect("captured");
        let (path, auth, body) = &captured[0];
        assert_eq!(path, "v17.0/1234567890");
        assert_eq!(auth, "Bearer EAAG-token");
        assert_eq!(body["messaging_product"], "whatsapp");
        assert_eq!(body["to"], "5511987654321");
        assert_eq!(body["type"], "text");
        assert_eq!(body["text"]["body"], "Olá!");
    }

    #[tokio::test]
    async fn rejected_messages_report_failure() {
        let (base_url, _captured) = spawn_graph(StatusCode::UNAUTHORIZED).await;
        let messenger = messenger(&base_url);

        let error = messenger.post_text("55", "oi").await.expect_err("rejected");
        assert!(matches!(error, TransportError::Rejected { status: 401, .. }));
        assert!(!messenger.send("55", "oi").await);
    }

    #[test]
    fn endpoint_follows_graph_layout() {
        let messenger = CloudApiMessenger::new(
            "v17.0",
            "998877",
            SecretString::from("t".to_string()),
            Duration::from_secs(1),
        )
        .expect("messenger");

        assert_eq!(messenger.endpoint(), "https://graph.facebook.com/v17.0/998877/messages");
    }

    #[tokio::test]
    async fn log_only_messenger_always_succeeds() {
        assert!(LogOnlyMessenger.send("55", "oi").await);
    }
}
