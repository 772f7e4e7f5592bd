use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use glassdesk_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use glassdesk_core::config::AppConfig;
use glassdesk_core::domain::session::{
    Channel, ChatMessage, EscalationInfo, EscalationReason, EscalationStatus, Role, Session,
    SessionKey, SessionState, GREETING,
};
use glassdesk_core::errors::ApplicationError;
use glassdesk_core::flows::{Action, FlowDefinition, FlowEngine, SupportFlow};
use glassdesk_core::identifier::EntityType;
use glassdesk_db::SessionStore;

use crate::answers::{RuleBasedAnswerGenerator, FALLBACK_ANSWER};
use crate::conversation::IntentDetector;
use crate::escalation::InMemoryEscalationService;
use crate::formatter::{FormatterError, ResponseFormatter};
use crate::lookup::FixtureStatusLookup;
use crate::services::{
    AnswerGenerator, CollaboratorError, EscalationRequest, EscalationService, StatusLookup,
};

/// Everything the orchestrator talks to, resolved once at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub lookup: Arc<dyn StatusLookup>,
    pub answers: Arc<dyn AnswerGenerator>,
    pub escalation: Arc<dyn EscalationService>,
    pub formatter: ResponseFormatter,
}

impl Collaborators {
    /// Demo customers, canned answers and an in-process escalation registry.
    pub fn fixtures() -> Result<Self, FormatterError> {
        Ok(Self {
            lookup: Arc::new(FixtureStatusLookup::new()),
            answers: Arc::new(RuleBasedAnswerGenerator::new()),
            escalation: Arc::new(InMemoryEscalationService::new()),
            formatter: ResponseFormatter::new()?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollaboratorTimeouts {
    pub lookup: Duration,
    pub answer: Duration,
    pub escalation: Duration,
}

impl Default for CollaboratorTimeouts {
    fn default() -> Self {
        Self {
            lookup: Duration::from_secs(10),
            answer: Duration::from_secs(30),
            escalation: Duration::from_secs(10),
        }
    }
}

impl CollaboratorTimeouts {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            lookup: Duration::from_secs(config.lookup.timeout_secs),
            answer: Duration::from_secs(config.llm.timeout_secs),
            escalation: Duration::from_secs(config.escalation.timeout_secs),
        }
    }
}

/// Result of one conversational turn as seen by a channel adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub reply: String,
    pub state: SessionState,
    pub action: &'static str,
}

struct Outcome {
    reply: String,
    action: Action,
}

struct TurnContext {
    key: SessionKey,
    correlation_id: String,
}

/// Runs the detect → decide → dispatch pipeline for one message.
///
/// Each call holds the session key's lock for its whole read-modify-write
/// cycle. Collaborator failures degrade to a reply; only session storage
/// errors are returned.
pub struct ActionOrchestrator<F = SupportFlow> {
    store: SessionStore,
    detector: IntentDetector,
    engine: FlowEngine<F>,
    collaborators: Collaborators,
    timeouts: CollaboratorTimeouts,
    audit: Arc<dyn AuditSink>,
}

impl ActionOrchestrator<SupportFlow> {
    pub fn new(
        store: SessionStore,
        collaborators: Collaborators,
        timeouts: CollaboratorTimeouts,
    ) -> Self {
        Self::with_engine(store, FlowEngine::default(), collaborators, timeouts)
    }
}

impl<F> ActionOrchestrator<F>
where
    F: FlowDefinition + Send + Sync,
{
    pub fn with_engine(
        store: SessionStore,
        engine: FlowEngine<F>,
        collaborators: Collaborators,
        timeouts: CollaboratorTimeouts,
    ) -> Self {
        Self {
            store,
            detector: IntentDetector::new(),
            engine,
            collaborators,
            timeouts,
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Produces the reply for one message. History is left to the caller.
    pub async fn process_input(
        &self,
        user_input: &str,
        channel: Channel,
        user_id: &str,
    ) -> Result<String, ApplicationError> {
        let _guard = self.store.lock(channel, user_id).await;
        let mut session = self.store.get_or_create(channel, user_id).await?;

        let outcome = self.run_turn(user_input, &mut session).await;
        self.store.save(&session).await?;
        Ok(outcome.reply)
    }

    /// Channel entry point: records the user's message and the reply in the
    /// session history along with the pipeline's state change.
    pub async fn converse(
        &self,
        user_input: &str,
        channel: Channel,
        user_id: &str,
    ) -> Result<Turn, ApplicationError> {
        let _guard = self.store.lock(channel, user_id).await;
        let mut session = self.store.get_or_create(channel, user_id).await?;
        session.push_message(Role::User, user_input);

        let outcome = self.run_turn(user_input, &mut session).await;
        // a reset already seeded the greeting
        if outcome.action != Action::ResetSession {
            session.push_message(Role::Assistant, outcome.reply.as_str());
        }
        self.store.save(&session).await?;

        Ok(Turn { reply: outcome.reply, state: session.state(), action: outcome.action.name() })
    }

    /// Explicit user reset. Returns the greeting that starts the new conversation.
    pub async fn reset_session(
        &self,
        channel: Channel,
        user_id: &str,
    ) -> Result<String, ApplicationError> {
        let _guard = self.store.lock(channel, user_id).await;
        let session = self.store.reset(channel, user_id).await?;
        info!(
            event_name = "agent.session.reset",
            session_key = %session.key(),
            "conversation reset by user"
        );
        Ok(GREETING.to_string())
    }

    /// Ordered history, oldest first. Unknown users have an empty history.
    pub async fn history(
        &self,
        channel: Channel,
        user_id: &str,
    ) -> Result<Vec<ChatMessage>, ApplicationError> {
        let _guard = self.store.lock(channel, user_id).await;
        let session = self.store.get(channel, user_id).await?;
        Ok(session.map(|session| session.conversation_history).unwrap_or_default())
    }

    async fn run_turn(&self, user_input: &str, session: &mut Session) -> Outcome {
        let turn = TurnContext {
            key: session.key(),
            correlation_id: Uuid::new_v4().to_string(),
        };

        let intent = self.detector.detect(user_input, session);
        let audit = AuditContext::new(Some(&turn.key), &turn.correlation_id, "action-orchestrator");
        let action =
            self.engine.determine_action_with_audit(&intent, session, self.audit.as_ref(), &audit);

        debug!(
            event_name = "agent.action.dispatched",
            correlation_id = %turn.correlation_id,
            session_key = %turn.key,
            state = ?session.state(),
            intent = ?intent.kind,
            confidence = intent.confidence,
            action = action.name(),
            "dispatching action"
        );

        let reply = self.dispatch(&action, session, &turn).await;
        Outcome { reply, action }
    }

    async fn dispatch(&self, action: &Action, session: &mut Session, turn: &TurnContext) -> String {
        match action {
            Action::QueryStatus { identifier, id_type } => {
                self.query_status(identifier, *id_type, session, turn).await
            }
            Action::AnswerQuestion { question } => self.answer_question(question, session).await,
            Action::Escalate { reason } => self.escalate(*reason, session, turn).await,
            Action::AskForIdentifier => {
                self.collaborators.formatter.ask_for_identifier(session.channel)
            }
            Action::ForwardToAgent { message, escalation_id } => {
                info!(
                    event_name = "agent.message.forwarded",
                    correlation_id = %turn.correlation_id,
                    session_key = %turn.key,
                    escalation_id = escalation_id.as_deref().unwrap_or("unknown"),
                    chars = message.chars().count(),
                    "message forwarded to support team"
                );
                self.collaborators.formatter.forwarded(escalation_id.as_deref(), session.channel)
            }
            Action::ResetSession => {
                warn!(
                    event_name = "agent.session.forced_reset",
                    correlation_id = %turn.correlation_id,
                    session_key = %turn.key,
                    "session state unrecognised, resetting"
                );
                session.reset();
                self.collaborators.formatter.greeting()
            }
        }
    }

    async fn query_status(
        &self,
        identifier: &str,
        id_type: EntityType,
        session: &mut Session,
        turn: &TurnContext,
    ) -> String {
        let formatter = &self.collaborators.formatter;
        let lookup = bounded(
            "status_lookup",
            self.timeouts.lookup,
            self.collaborators.lookup.lookup(id_type, identifier),
        )
        .await
        .and_then(|result| result);

        match lookup {
            Ok(Some(record)) => {
                let reply = formatter.status(&record, session.channel);
                session.mark_identified(record);
                reply
            }
            Ok(None) => {
                debug!(
                    event_name = "agent.lookup.not_found",
                    correlation_id = %turn.correlation_id,
                    session_key = %turn.key,
                    id_type = id_type.as_str(),
                    "no service record for identifier"
                );
                session.await_identifier();
                formatter.not_found(id_type, session.channel)
            }
            Err(error) => {
                warn!(
                    event_name = "agent.lookup.failed",
                    correlation_id = %turn.correlation_id,
                    session_key = %turn.key,
                    id_type = id_type.as_str(),
                    error = %error,
                    "status lookup failed"
                );
                session.await_identifier();
                formatter.not_found(id_type, session.channel)
            }
        }
    }

    async fn answer_question(&self, question: &str, session: &Session) -> String {
        let Some(record) = session.client_info() else {
            return self.collaborators.formatter.need_identification(session.channel);
        };

        match bounded(
            "answer_generation",
            self.timeouts.answer,
            self.collaborators.answers.generate(question, record, session.channel),
        )
        .await
        {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => FALLBACK_ANSWER.to_string(),
            Err(error) => {
                warn!(
                    event_name = "agent.answer.failed",
                    session_key = %session.key(),
                    error = %error,
                    "answer generation failed"
                );
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    async fn escalate(
        &self,
        reason: EscalationReason,
        session: &mut Session,
        turn: &TurnContext,
    ) -> String {
        let request = EscalationRequest {
            user_id: session.user_id.clone(),
            channel: session.channel,
            history: session.conversation_history.clone(),
            reason,
        };
        let escalated = bounded(
            "escalation",
            self.timeouts.escalation,
            self.collaborators.escalation.escalate(request),
        )
        .await
        .and_then(|result| result);
        let audit = AuditContext::new(Some(&turn.key), &turn.correlation_id, "action-orchestrator");

        match escalated {
            Ok(escalation_id) => {
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "escalation.opened",
                        AuditCategory::Escalation,
                        AuditOutcome::Success,
                    )
                    .with_metadata("escalation_id", escalation_id.as_str())
                    .with_metadata("reason", reason.as_str()),
                );
                info!(
                    event_name = "agent.escalated",
                    correlation_id = %turn.correlation_id,
                    session_key = %turn.key,
                    escalation_id = %escalation_id,
                    reason = reason.as_str(),
                    "conversation escalated"
                );
                let reply =
                    self.collaborators.formatter.escalation(&escalation_id, session.channel);
                session.mark_escalated(EscalationInfo {
                    reason,
                    timestamp: Utc::now(),
                    escalation_id,
                    status: EscalationStatus::Pending,
                });
                reply
            }
            Err(error) => {
                warn!(
                    event_name = "agent.escalation.failed",
                    correlation_id = %turn.correlation_id,
                    session_key = %turn.key,
                    error = %error,
                    "escalation failed"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "escalation.failed",
                        AuditCategory::Escalation,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("reason", reason.as_str())
                    .with_metadata("error", error.to_string()),
                );
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}

async fn bounded<T>(
    operation: &'static str,
    budget: Duration,
    future: impl Future<Output = T>,
) -> Result<T, CollaboratorError> {
    tokio::time::timeout(budget, future)
        .await
        .map_err(|_| CollaboratorError::Timeout { operation, timeout_secs: budget.as_secs() })
}
