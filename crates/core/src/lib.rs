pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod identifier;

pub use domain::record::{ServiceRecord, StatusTone, Vehicle};
pub use domain::session::{
    Channel, ChatMessage, EscalationInfo, EscalationReason, EscalationStatus, Role, Session,
    SessionId, SessionKey, SessionState, GREETING,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{Action, FlowEngine, Intent, IntentKind, SupportFlow};
pub use identifier::{classify, Classification, EntityType};
