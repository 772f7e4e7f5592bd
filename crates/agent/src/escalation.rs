use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use glassdesk_core::domain::session::{Channel, EscalationReason, EscalationStatus};

use crate::services::{CollaboratorError, EscalationRequest, EscalationService};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EscalationTicket {
    pub escalation_id: String,
    pub user_id: String,
    pub channel: Channel,
    pub reason: EscalationReason,
    pub history_len: usize,
    pub status: EscalationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// In-process registry of hand-offs. Protocol ids are eight upper-case hex
/// characters.
#[derive(Default)]
pub struct InMemoryEscalationService {
    tickets: RwLock<HashMap<String, EscalationTicket>>,
}

impl InMemoryEscalationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ticket(&self, escalation_id: &str) -> Option<EscalationTicket> {
        self.tickets.read().await.get(escalation_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }
}

fn protocol_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id.make_ascii_uppercase();
    id
}

#[async_trait]
impl EscalationService for InMemoryEscalationService {
    async fn escalate(&self, request: EscalationRequest) -> Result<String, CollaboratorError> {
        let mut tickets = self.tickets.write().await;
        let escalation_id = loop {
            let candidate = protocol_id();
            if !tickets.contains_key(&candidate) {
                break candidate;
            }
        };

        info!(
            event_name = "escalation.created",
            escalation_id = %escalation_id,
            channel = %request.channel,
            reason = request.reason.as_str(),
            "conversation handed off to support team"
        );
        tickets.insert(
            escalation_id.clone(),
            EscalationTicket {
                escalation_id: escalation_id.clone(),
                user_id: request.user_id,
                channel: request.channel,
                reason: request.reason,
                history_len: request.history.len(),
                status: EscalationStatus::Pending,
                created_at: Utc::now(),
                updated_at: None,
            },
        );
        Ok(escalation_id)
    }

    async fn get_status(&self, escalation_id: &str) -> Result<EscalationStatus, CollaboratorError> {
        self.tickets
            .read()
            .await
            .get(escalation_id)
            .map(|ticket| ticket.status)
            .ok_or_else(|| CollaboratorError::UnknownEscalation(escalation_id.to_string()))
    }

    async fn update_status(
        &self,
        escalation_id: &str,
        status: EscalationStatus,
    ) -> Result<(), CollaboratorError> {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(escalation_id)
            .ok_or_else(|| CollaboratorError::UnknownEscalation(escalation_id.to_string()))?;
        ticket.status = status;
        ticket.updated_at = Some(Utc::now());
        Ok(())
    }
}
