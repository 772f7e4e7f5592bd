use async_trait::async_trait;
use thiserror::Error;

use glassdesk_core::domain::record::ServiceRecord;
use glassdesk_core::domain::session::{
    Channel, ChatMessage, EscalationReason, EscalationStatus,
};
use glassdesk_core::identifier::EntityType;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout { operation: &'static str, timeout_secs: u64 },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("unknown escalation `{0}`")]
    UnknownEscalation(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::UnexpectedResponse(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

/// Backend lookup of a customer's service order.
#[async_trait]
pub trait StatusLookup: Send + Sync {
    /// `Ok(None)` means the backend answered and has no matching record.
    async fn lookup(
        &self,
        id_type: EntityType,
        identifier: &str,
    ) -> Result<Option<ServiceRecord>, CollaboratorError>;
}

/// Produces the reply for a follow-up question about a known record.
///
/// Implementations absorb their own failures and always return usable text.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, record: &ServiceRecord, channel: Channel) -> String;
}

#[derive(Clone, Debug)]
pub struct EscalationRequest {
    pub user_id: String,
    pub channel: Channel,
    pub history: Vec<ChatMessage>,
    pub reason: EscalationReason,
}

/// Hand-off of a conversation to the human support team.
#[async_trait]
pub trait EscalationService: Send + Sync {
    async fn escalate(&self, request: EscalationRequest) -> Result<String, CollaboratorError>;
    async fn get_status(&self, escalation_id: &str)
        -> Result<EscalationStatus, CollaboratorError>;
    async fn update_status(
        &self,
        escalation_id: &str,
        status: EscalationStatus,
    ) -> Result<(), CollaboratorError>;
}
