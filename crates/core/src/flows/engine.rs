use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::session::{EscalationReason, Session, SessionState};
use crate::flows::answerability::{AnswerabilityPolicy, KeywordAnswerability};
use crate::flows::states::{Action, Intent, IntentKind};

/// A state-conditioned rule table mapping an intent to the next action.
pub trait FlowDefinition {
    fn initial_state(&self) -> SessionState;
    fn decide(&self, intent: &Intent, session: &Session) -> Action;
}

/// The customer support conversation: identify, follow up, hand off.
#[derive(Clone, Debug)]
pub struct SupportFlow<P = KeywordAnswerability> {
    answerability: P,
}

impl Default for SupportFlow<KeywordAnswerability> {
    fn default() -> Self {
        Self { answerability: KeywordAnswerability::default() }
    }
}

impl<P> SupportFlow<P>
where
    P: AnswerabilityPolicy,
{
    pub fn with_policy(answerability: P) -> Self {
        Self { answerability }
    }
}

impl<P> FlowDefinition for SupportFlow<P>
where
    P: AnswerabilityPolicy,
{
    fn initial_state(&self) -> SessionState {
        SessionState::AwaitingIdentifier
    }

    fn decide(&self, intent: &Intent, session: &Session) -> Action {
        match session.state() {
            SessionState::AwaitingIdentifier => decide_awaiting_identifier(intent),
            SessionState::AwaitingFollowup => {
                decide_awaiting_followup(intent, &self.answerability)
            }
            SessionState::Escalated => Action::ForwardToAgent {
                message: intent.value.clone(),
                escalation_id: session.escalation_id().map(str::to_string),
            },
            SessionState::Unknown => Action::ResetSession,
        }
    }
}

fn decide_awaiting_identifier(intent: &Intent) -> Action {
    match (intent.kind, intent.entity_type) {
        (IntentKind::ProvideIdentifier, Some(id_type)) => {
            Action::QueryStatus { identifier: intent.value.clone(), id_type }
        }
        _ => Action::AskForIdentifier,
    }
}

fn decide_awaiting_followup<P>(intent: &Intent, answerability: &P) -> Action
where
    P: AnswerabilityPolicy,
{
    match (intent.kind, intent.entity_type) {
        (IntentKind::RequestHuman, _) => {
            Action::Escalate { reason: EscalationReason::CustomerRequest }
        }
        (IntentKind::ProvideIdentifier, Some(id_type)) => {
            Action::QueryStatus { identifier: intent.value.clone(), id_type }
        }
        (IntentKind::AskQuestion, _) if !answerability.is_answerable(&intent.value) => {
            Action::Escalate { reason: EscalationReason::ComplexQuestion }
        }
        _ => Action::AnswerQuestion { question: intent.value.clone() },
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> SessionState {
        self.flow.initial_state()
    }

    pub fn determine_action(&self, intent: &Intent, session: &Session) -> Action {
        self.flow.decide(intent, session)
    }

    pub fn determine_action_with_audit<S>(
        &self,
        intent: &Intent,
        session: &Session,
        sink: &S,
        audit: &AuditContext,
    ) -> Action
    where
        S: AuditSink + ?Sized,
    {
        let action = self.determine_action(intent, session);
        let outcome = if matches!(action, Action::ResetSession) {
            AuditOutcome::Rejected
        } else {
            AuditOutcome::Success
        };
        sink.emit(
            AuditEvent::new(audit, "flow.action_determined", AuditCategory::Flow, outcome)
                .with_metadata("state", format!("{:?}", session.state()))
                .with_metadata("intent", format!("{:?}", intent.kind))
                .with_metadata("action", action.name()),
        );
        action
    }
}

impl Default for FlowEngine<SupportFlow> {
    fn default() -> Self {
        Self::new(SupportFlow::default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::domain::record::{ServiceRecord, Vehicle};
    use crate::domain::session::{
        Channel, EscalationInfo, EscalationReason, EscalationStatus, Session, SessionState,
    };
    use crate::flows::engine::{FlowEngine, SupportFlow};
    use crate::flows::states::{Action, Intent, IntentKind};
    use crate::identifier::EntityType;

    fn record() -> ServiceRecord {
        ServiceRecord {
            name: "João da Silva".to_string(),
            tax_id: Some("12345678900".to_string()),
            phone: Some("11987654321".to_string()),
            order_id: "ORD123456".to_string(),
            status: "Em andamento".to_string(),
            service_type: "Troca de Parabrisa".to_string(),
            vehicle: Vehicle {
                model: "Honda Civic".to_string(),
                plate: "ABC1234".to_string(),
                year: "2020".to_string(),
            },
            summary: None,
        }
    }

    fn session_in(state: SessionState) -> Session {
        let mut session = Session::new(Channel::Web, "user-1");
        match state {
            SessionState::AwaitingFollowup => session.mark_identified(record()),
            SessionState::Escalated => {
                session.mark_identified(record());
                session.mark_escalated(EscalationInfo {
                    reason: EscalationReason::CustomerRequest,
                    timestamp: Utc::now(),
                    escalation_id: "A1B2C3D4".to_string(),
                    status: EscalationStatus::Pending,
                });
            }
            SessionState::AwaitingIdentifier => {}
            SessionState::Unknown => {
                let mut value = serde_json::to_value(&session).expect("encode");
                value["state"] = serde_json::Value::String("legacy_menu".to_string());
                session = serde_json::from_value(value).expect("decode");
            }
        }
        session
    }

    fn tax_id_intent() -> Intent {
        Intent::identifier(EntityType::TaxId, "12345678900", 0.95)
    }

    #[test]
    fn awaiting_identifier_queries_status_for_identifiers() {
        let engine = FlowEngine::default();
        let action = engine
            .determine_action(&tax_id_intent(), &session_in(SessionState::AwaitingIdentifier));

        assert_eq!(
            action,
            Action::QueryStatus {
                identifier: "12345678900".to_string(),
                id_type: EntityType::TaxId
            }
        );
    }

    #[test]
    fn awaiting_identifier_asks_again_for_everything_else() {
        let engine = FlowEngine::default();
        let session = session_in(SessionState::AwaitingIdentifier);

        for kind in [IntentKind::RequestHuman, IntentKind::AskStatus, IntentKind::AskQuestion] {
            let action = engine.determine_action(&Intent::message(kind, "oi", 0.6), &session);
            assert_eq!(action, Action::AskForIdentifier, "intent: {kind:?}");
        }
    }

    #[test]
    fn followup_rule_table() {
        let engine = FlowEngine::default();
        let session = session_in(SessionState::AwaitingFollowup);
        let long_question = "gostaria de entender melhor como funciona aquele procedimento \
            especial que vocês fazem quando o carro chega muito sujo de barro depois de uma \
            viagem longa pela estrada";

        let cases = [
            (
                Intent::message(IntentKind::RequestHuman, "quero falar com atendente", 0.9),
                Action::Escalate { reason: EscalationReason::CustomerRequest },
            ),
            (
                Intent::message(IntentKind::AskStatus, "qual o andamento?", 0.8),
                Action::AnswerQuestion { question: "qual o andamento?".to_string() },
            ),
            (
                Intent::identifier(EntityType::Plate, "DEF5678", 0.95),
                Action::QueryStatus {
                    identifier: "DEF5678".to_string(),
                    id_type: EntityType::Plate,
                },
            ),
            (
                Intent::message(IntentKind::AskQuestion, "qual a garantia?", 0.6),
                Action::AnswerQuestion { question: "qual a garantia?".to_string() },
            ),
            (
                Intent::message(IntentKind::AskQuestion, long_question, 0.6),
                Action::Escalate { reason: EscalationReason::ComplexQuestion },
            ),
        ];

        for (intent, expected) in cases {
            assert_eq!(engine.determine_action(&intent, &session), expected, "{intent:?}");
        }
    }

    #[test]
    fn escalated_sessions_always_forward() {
        let engine = FlowEngine::default();
        let session = session_in(SessionState::Escalated);

        for intent in [
            tax_id_intent(),
            Intent::message(IntentKind::RequestHuman, "atendente", 0.9),
            Intent::message(IntentKind::AskQuestion, "alô?", 0.6),
        ] {
            let action = engine.determine_action(&intent, &session);
            assert!(matches!(
                action,
                Action::ForwardToAgent { ref escalation_id, .. }
                    if escalation_id.as_deref() == Some("A1B2C3D4")
            ));
        }
    }

    #[test]
    fn unknown_state_resets_session() {
        let engine = FlowEngine::default();
        let action =
            engine.determine_action(&tax_id_intent(), &session_in(SessionState::Unknown));
        assert_eq!(action, Action::ResetSession);
    }

    #[test]
    fn decisions_are_deterministic() {
        let engine = FlowEngine::new(SupportFlow::default());
        let session = session_in(SessionState::AwaitingFollowup);
        let intent = Intent::message(IntentKind::AskQuestion, "qual loja?", 0.6);

        let first = engine.determine_action(&intent, &session);
        let second = engine.determine_action(&intent, &session);
        assert_eq!(first, second);
    }

    #[test]
    fn audit_variant_emits_one_event_per_decision() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let session = session_in(SessionState::Unknown);
        let audit = AuditContext::new(Some(&session.key()), "req-42", "decision-engine");

        let action =
            engine.determine_action_with_audit(&tax_id_intent(), &session, &sink, &audit);

        assert_eq!(action, Action::ResetSession);
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "flow.action_determined");
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
        assert_eq!(events[0].metadata.get("action").map(String::as_str), Some("reset_session"));
    }
}
