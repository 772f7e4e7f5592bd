//! WhatsApp Business channel adapter
//!
//! - **Payloads** (`payload`) - webhook body model and event extraction
//! - **Events** (`events`) - dispatcher routing events to handlers
//! - **Messenger** (`messenger`) - outbound text delivery via the Cloud API
//! - **Verification** (`verify`) - `hub.challenge` subscription handshake
//!
//! # Architecture
//!
//! ```text
//! POST /webhook → WebhookPayload → EventDispatcher → TextMessageHandler
//!                                                      ↓
//!                          Messenger ← reply ← ActionOrchestrator
//! ```

pub mod events;
pub mod messenger;
pub mod payload;
pub mod verify;

pub use events::{
    default_dispatcher, ConversationService, EventContext, EventDispatcher, HandlerResult,
    OrchestratorConversation, TextMessageHandler, WhatsAppEvent, WhatsAppEventType,
};
pub use messenger::{CloudApiMessenger, LogOnlyMessenger, Messenger, TransportError};
pub use payload::WebhookPayload;
pub use verify::{verify_subscription, VerificationError};
