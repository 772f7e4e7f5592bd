pub mod answerability;
pub mod engine;
pub mod states;

pub use answerability::{AnswerabilityPolicy, KeywordAnswerability};
pub use engine::{FlowDefinition, FlowEngine, SupportFlow};
pub use states::{Action, Intent, IntentKind};
