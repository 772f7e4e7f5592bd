//! Conversation runtime for the glass repair support assistant.
//!
//! Turns one inbound customer message into one reply:
//!
//! # Architecture
//!
//! 1. **Intent Detection** (`conversation`) - message → typed `Intent`
//! 2. **Decision** (`glassdesk_core::flows`) - `(Intent, Session)` → `Action`
//! 3. **Dispatch** (`runtime`) - run the action against collaborators and
//!    persist the resulting session under the per-key lock
//! 4. **Formatting** (`formatter`) - channel-specific reply text
//!
//! # Collaborators
//!
//! Everything that leaves the process sits behind a trait in `services`:
//! status lookup (`lookup`), answer generation (`answers`, `llm`) and human
//! hand-off (`escalation`). Calls are bounded by timeouts and failures turn
//! into a polite reply, never an error for the channel adapter.

pub mod answers;
pub mod conversation;
pub mod escalation;
pub mod formatter;
pub mod llm;
pub mod lookup;
pub mod runtime;
pub mod services;

pub use conversation::IntentDetector;
pub use runtime::{ActionOrchestrator, CollaboratorTimeouts, Collaborators, Turn};
pub use services::{AnswerGenerator, CollaboratorError, EscalationService, StatusLookup};
