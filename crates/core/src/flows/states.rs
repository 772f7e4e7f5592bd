use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::session::EscalationReason;
use crate::identifier::EntityType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ProvideIdentifier,
    RequestHuman,
    AskStatus,
    AskQuestion,
}

/// Classification of one inbound message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub value: String,
    /// Set only for [`IntentKind::ProvideIdentifier`].
    pub entity_type: Option<EntityType>,
    pub confidence: f32,
}

impl Intent {
    pub fn identifier(entity_type: EntityType, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            kind: IntentKind::ProvideIdentifier,
            value: value.into(),
            entity_type: Some(entity_type),
            confidence,
        }
    }

    pub fn message(kind: IntentKind, value: impl Into<String>, confidence: f32) -> Self {
        Self { kind, value: value.into(), entity_type: None, confidence }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    QueryStatus { identifier: String, id_type: EntityType },
    AskForIdentifier,
    AnswerQuestion { question: String },
    Escalate { reason: EscalationReason },
    ForwardToAgent { message: String, escalation_id: Option<String> },
    ResetSession,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QueryStatus { .. } => "query_status",
            Self::AskForIdentifier => "ask_for_identifier",
            Self::AnswerQuestion { .. } => "answer_question",
            Self::Escalate { .. } => "escalate",
            Self::ForwardToAgent { .. } => "forward_to_agent",
            Self::ResetSession => "reset_session",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
