use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::record::ServiceRecord;
use crate::errors::DomainError;

pub const GREETING: &str = "Olá! Sou o assistente virtual da CarGlass. Por favor, informe seu CPF, \
telefone, placa, ordem de serviço ou chassi para que eu possa te ajudar.";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Web,
    Whatsapp,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Whatsapp => "whatsapp",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(DomainError::InvariantViolation(format!("unknown channel `{other}`"))),
        }
    }
}

/// Conversation state driving the decision table.
///
/// `Unknown` only appears when a persisted document carries a state this
/// build does not recognise; the decision engine answers it with a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingIdentifier,
    AwaitingFollowup,
    Escalated,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), timestamp: Utc::now() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    CustomerRequest,
    ComplexQuestion,
}

impl EscalationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CustomerRequest => "customer_request",
            Self::ComplexQuestion => "complex_question",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Pending,
    InProgress,
    Resolved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationInfo {
    pub reason: EscalationReason,
    pub timestamp: DateTime<Utc>,
    pub escalation_id: String,
    pub status: EscalationStatus,
}

/// Storage key for one conversation: `session:{channel}:{user_id}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(channel: Channel, user_id: &str) -> Self {
        Self(format!("session:{channel}:{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub channel: Channel,
    pub user_id: String,
    state: SessionState,
    pub conversation_history: Vec<ChatMessage>,
    client_info: Option<ServiceRecord>,
    escalation_info: Option<EscalationInfo>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(channel: Channel, user_id: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::generate(),
            channel,
            user_id: user_id.into(),
            state: SessionState::AwaitingIdentifier,
            conversation_history: vec![ChatMessage::new(Role::Assistant, GREETING)],
            client_info: None,
            escalation_info: None,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.channel, &self.user_id)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client_info(&self) -> Option<&ServiceRecord> {
        self.client_info.as_ref()
    }

    pub fn escalation_info(&self) -> Option<&EscalationInfo> {
        self.escalation_info.as_ref()
    }

    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.conversation_history.push(ChatMessage::new(role, content));
    }

    /// Stores a resolved record and moves the conversation to follow-up.
    pub fn mark_identified(&mut self, record: ServiceRecord) {
        self.client_info = Some(record);
        self.state = SessionState::AwaitingFollowup;
    }

    /// Returns to identifier collection. A previously resolved record is kept
    /// so a later re-identification can still fall back on it.
    pub fn await_identifier(&mut self) {
        self.state = SessionState::AwaitingIdentifier;
    }

    pub fn mark_escalated(&mut self, info: EscalationInfo) {
        self.escalation_info = Some(info);
        self.state = SessionState::Escalated;
    }

    /// Reinitialises the conversation while keeping identity fields.
    pub fn reset(&mut self) {
        self.state = SessionState::AwaitingIdentifier;
        self.conversation_history = vec![ChatMessage::new(Role::Assistant, GREETING)];
        self.client_info = None;
        self.escalation_info = None;
    }

    pub fn escalation_id(&self) -> Option<&str> {
        self.escalation_info.as_ref().map(|info| info.escalation_id.as_str())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.state == SessionState::Escalated && self.escalation_info.is_none() {
            return Err(DomainError::InvariantViolation(format!(
                "{} is escalated without escalation info",
                self.key()
            )));
        }
        if self.state == SessionState::AwaitingFollowup && self.client_info.is_none() {
            return Err(DomainError::InvariantViolation(format!(
                "{} awaits follow-up without client info",
                self.key()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        Channel, EscalationInfo, EscalationReason, EscalationStatus, Role, Session, SessionKey,
        SessionState, GREETING,
    };
    use crate::domain::record::{ServiceRecord, Vehicle};

    fn record() -> ServiceRecord {
        ServiceRecord {
            name: "Maria Oliveira".to_string(),
            tax_id: Some("98765432100".to_string()),
            phone: Some("11987654321".to_string()),
            order_id: "ORD654321".to_string(),
            status: "Concluído".to_string(),
            service_type: "Reparo de Vidro".to_string(),
            vehicle: Vehicle {
                model: "Toyota Corolla".to_string(),
                plate: "DEF5678".to_string(),
                year: "2022".to_string(),
            },
            summary: None,
        }
    }

    #[test]
    fn new_session_starts_awaiting_identifier_with_greeting() {
        let session = Session::new(Channel::Web, "user-1");

        assert_eq!(session.state(), SessionState::AwaitingIdentifier);
        assert_eq!(session.conversation_history.len(), 1);
        assert_eq!(session.conversation_history[0].role, Role::Assistant);
        assert_eq!(session.conversation_history[0].content, GREETING);
        assert!(session.validate().is_ok());
    }

    #[test]
    fn key_uses_channel_and_user_id() {
        let session = Session::new(Channel::Whatsapp, "5511999990000");
        assert_eq!(session.key().as_str(), "session:whatsapp:5511999990000");
        assert_eq!(session.key(), SessionKey::new(Channel::Whatsapp, "5511999990000"));
    }

    #[test]
    fn reset_keeps_identity_and_clears_progress() {
        let mut session = Session::new(Channel::Web, "user-2");
        let session_id = session.session_id.clone();
        session.push_message(Role::User, "12345678900");
        session.mark_identified(record());
        session.mark_escalated(EscalationInfo {
            reason: EscalationReason::CustomerRequest,
            timestamp: Utc::now(),
            escalation_id: "AB12CD34".to_string(),
            status: EscalationStatus::Pending,
        });

        session.reset();

        assert_eq!(session.session_id, session_id);
        assert_eq!(session.user_id, "user-2");
        assert_eq!(session.state(), SessionState::AwaitingIdentifier);
        assert_eq!(session.conversation_history.len(), 1);
        assert!(session.client_info().is_none());
        assert!(session.escalation_info().is_none());
    }

    fn decoded_in(user_id: &str, state: &str) -> Session {
        let mut value =
            serde_json::to_value(Session::new(Channel::Web, user_id)).expect("serialize");
        value["state"] = serde_json::Value::String(state.to_string());
        serde_json::from_value(value).expect("deserialize")
    }

    #[test]
    fn validate_rejects_broken_state_combinations() {
        let escalated = decoded_in("user-3", "escalated");
        assert_eq!(escalated.state(), SessionState::Escalated);
        assert!(escalated.validate().is_err());

        let mut followup = decoded_in("user-4", "awaiting_followup");
        assert!(followup.validate().is_err());

        followup.mark_identified(record());
        assert!(followup.validate().is_ok());
    }

    #[test]
    fn transitions_keep_state_and_payload_consistent() {
        let mut session = Session::new(Channel::Web, "user-7");

        session.mark_identified(record());
        assert_eq!(session.state(), SessionState::AwaitingFollowup);
        let name = session.client_info().map(|record| record.name.as_str());
        assert_eq!(name, Some("Maria Oliveira"));
        assert!(session.validate().is_ok());

        session.await_identifier();
        assert_eq!(session.state(), SessionState::AwaitingIdentifier);
        assert!(session.client_info().is_some());
        assert!(session.validate().is_ok());

        session.mark_escalated(EscalationInfo {
            reason: EscalationReason::ComplexQuestion,
            timestamp: Utc::now(),
            escalation_id: "9A8B7C6D".to_string(),
            status: EscalationStatus::Pending,
        });
        assert_eq!(session.state(), SessionState::Escalated);
        assert_eq!(session.escalation_id(), Some("9A8B7C6D"));
        assert!(session.validate().is_ok());
    }

    #[test]
    fn json_round_trip_preserves_every_field() {
        let mut session = Session::new(Channel::Whatsapp, "user-5");
        session.push_message(Role::User, "DEF5678");
        session.mark_identified(record());
        session.push_message(Role::Assistant, "Olá Maria Oliveira!");
        session.mark_escalated(EscalationInfo {
            reason: EscalationReason::ComplexQuestion,
            timestamp: Utc::now(),
            escalation_id: "0F1E2D3C".to_string(),
            status: EscalationStatus::Pending,
        });

        let raw = serde_json::to_string(&session).expect("serialize session");
        let restored: Session = serde_json::from_str(&raw).expect("deserialize session");

        assert_eq!(restored, session);
        let contents: Vec<_> =
            restored.conversation_history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec![GREETING, "DEF5678", "Olá Maria Oliveira!"]);
    }

    #[test]
    fn unrecognised_state_deserialises_as_unknown() {
        let mut value =
            serde_json::to_value(Session::new(Channel::Web, "user-6")).expect("serialize");
        value["state"] = serde_json::Value::String("legacy_menu".to_string());

        let restored: Session = serde_json::from_value(value).expect("deserialize");
        assert_eq!(restored.state(), SessionState::Unknown);
    }

    #[test]
    fn channel_parses_case_insensitively() {
        assert_eq!("WhatsApp".parse::<Channel>().ok(), Some(Channel::Whatsapp));
        assert!("sms".parse::<Channel>().is_err());
    }
}
