use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info};

use glassdesk_agent::ActionOrchestrator;
use glassdesk_core::domain::session::{Channel, SessionKey};

use crate::messenger::Messenger;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WhatsAppEvent {
    TextMessage(TextMessageEvent),
    StatusUpdate(StatusUpdateEvent),
    Unsupported { event_type: String },
}

impl WhatsAppEvent {
    pub fn event_type(&self) -> WhatsAppEventType {
        match self {
            Self::TextMessage(_) => WhatsAppEventType::TextMessage,
            Self::StatusUpdate(_) => WhatsAppEventType::StatusUpdate,
            Self::Unsupported { .. } => WhatsAppEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WhatsAppEventType {
    TextMessage,
    StatusUpdate,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessageEvent {
    /// Sender phone number; doubles as the channel-scoped user id.
    pub from: String,
    pub message_id: String,
    pub text: String,
    pub contact_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdateEvent {
    pub message_id: String,
    pub status: String,
    pub recipient_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into() }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Replied { to: String, text: String, delivered: bool },
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("conversation handler failure: {0}")]
    Conversation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> WhatsAppEventType;
    async fn handle(
        &self,
        event: &WhatsAppEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<WhatsAppEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        event: &WhatsAppEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(event, ctx).await.map_err(DispatchError::from)
    }

    /// Dispatches events one after another. A failing event is logged and
    /// does not stop the rest.
    pub async fn dispatch_all(
        &self,
        events: &[WhatsAppEvent],
        ctx: &EventContext,
    ) -> Vec<HandlerResult> {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            match self.dispatch(event, ctx).await {
                Ok(result) => results.push(result),
                Err(dispatch_error) => {
                    error!(
                        event_name = "whatsapp.dispatch.failed",
                        correlation_id = %ctx.correlation_id,
                        session_key = "unknown",
                        error = %dispatch_error,
                        "webhook event handler failed"
                    );
                }
            }
        }
        results
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher<S>(conversation: S, messenger: Arc<dyn Messenger>) -> EventDispatcher
where
    S: ConversationService + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(TextMessageHandler::new(conversation, messenger));
    dispatcher.register(StatusUpdateHandler);
    dispatcher
}

/// Turns an inbound text into the reply that should be sent back.
#[async_trait]
pub trait ConversationService: Send + Sync {
    async fn respond(
        &self,
        user_id: &str,
        text: &str,
        ctx: &EventContext,
    ) -> Result<String, EventHandlerError>;
}

/// Routes WhatsApp conversations through the action orchestrator. Storage
/// failures still produce a polite reply so the sender is never left waiting.
#[derive(Clone)]
pub struct OrchestratorConversation {
    orchestrator: Arc<ActionOrchestrator>,
}

impl OrchestratorConversation {
    pub fn new(orchestrator: Arc<ActionOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl ConversationService for OrchestratorConversation {
    async fn respond(
        &self,
        user_id: &str,
        text: &str,
        ctx: &EventContext,
    ) -> Result<String, EventHandlerError> {
        match self.orchestrator.converse(text, Channel::Whatsapp, user_id).await {
            Ok(turn) => Ok(turn.reply),
            Err(application_error) => {
                let interface = application_error.into_interface(ctx.correlation_id.clone());
                error!(
                    event_name = "whatsapp.conversation.failed",
                    correlation_id = %ctx.correlation_id,
                    session_key = %SessionKey::new(Channel::Whatsapp, user_id),
                    error = %interface,
                    "conversation turn failed"
                );
                Ok(interface.user_message().to_string())
            }
        }
    }
}

pub struct TextMessageHandler<S> {
    service: S,
    messenger: Arc<dyn Messenger>,
}

impl<S> TextMessageHandler<S>
where
    S: ConversationService,
{
    pub fn new(service: S, messenger: Arc<dyn Messenger>) -> Self {
        Self { service, messenger }
    }
}

#[async_trait]
impl<S> EventHandler for TextMessageHandler<S>
where
    S: ConversationService + 'static,
{
    fn event_type(&self) -> WhatsAppEventType {
        WhatsAppEventType::TextMessage
    }

    async fn handle(
        &self,
        event: &WhatsAppEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let WhatsAppEvent::TextMessage(message) = event else {
            return Ok(HandlerResult::Ignored);
        };
        let reply = self.service.respond(&message.from, &message.text, ctx).await?;
        let delivered = self.messenger.send(&message.from, &reply).await;
        info!(
            event_name = "whatsapp.message.processed",
            correlation_id = %ctx.correlation_id,
            session_key = %SessionKey::new(Channel::Whatsapp, &message.from),
            message_id = %message.message_id,
            delivered,
            "whatsapp message processed"
        );

        Ok(HandlerResult::Replied { to: message.from.clone(), text: reply, delivered })
    }
}

pub struct StatusUpdateHandler;

#[async_trait]
impl EventHandler for StatusUpdateHandler {
    fn event_type(&self) -> WhatsAppEventType {
        WhatsAppEventType::StatusUpdate
    }

    async fn handle(
        &self,
        event: &WhatsAppEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let WhatsAppEvent::StatusUpdate(update) = event else {
            return Ok(HandlerResult::Ignored);
        };

        debug!(
            event_name = "whatsapp.status.received",
            correlation_id = %ctx.correlation_id,
            session_key = "unknown",
            message_id = %update.message_id,
            status = %update.status,
            "delivery status callback"
        );
        Ok(HandlerResult::Processed)
    }
}
