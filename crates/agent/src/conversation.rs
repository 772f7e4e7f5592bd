use glassdesk_core::domain::session::Session;
use glassdesk_core::flows::states::{Intent, IntentKind};
use glassdesk_core::identifier::classify;

pub const IDENTIFIER_CONFIDENCE: f32 = 0.95;
pub const REQUEST_HUMAN_CONFIDENCE: f32 = 0.9;
pub const ASK_STATUS_CONFIDENCE: f32 = 0.8;
pub const ASK_QUESTION_CONFIDENCE: f32 = 0.6;

const HUMAN_WORDS: &[&str] = &[
    "falar",
    "conversar",
    "atendente",
    "pessoa",
    "humano",
    "operador",
    "talk",
    "speak",
    "agent",
    "operator",
    "human",
    "person",
];

const FRUSTRATION_WORDS: &[&str] = &["bot", "chatbot", "robô", "robo"];

const FRUSTRATION_PHRASES: &[&str] = &[
    "não ajuda",
    "não ajudou",
    "não está ajudando",
    "nao ajuda",
    "ajudou não",
    "not helping",
    "not helpful",
];

const STATUS_WORDS: &[&str] = &[
    "status",
    "andamento",
    "situação",
    "situacao",
    "etapa",
    "fase",
    "prazo",
    "previsão",
    "previsao",
    "progress",
    "stage",
    "deadline",
    "forecast",
];

/// Rule-based intent classification.
///
/// The session is accepted so context-sensitive rules can be added without
/// touching callers; none of the current rules read it.
#[derive(Clone, Debug, Default)]
pub struct IntentDetector;

impl IntentDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, message: &str, _session: &Session) -> Intent {
        let normalized = normalize_text(message);

        let classification = classify(&normalized);
        if let Some(entity_type) = classification.entity_type {
            return Intent::identifier(entity_type, classification.value, IDENTIFIER_CONFIDENCE);
        }

        let tokens = tokenize(&normalized);
        if requests_human(&tokens) {
            return Intent::message(IntentKind::RequestHuman, normalized, REQUEST_HUMAN_CONFIDENCE);
        }
        if contains_any_word(&tokens, STATUS_WORDS) {
            return Intent::message(IntentKind::AskStatus, normalized, ASK_STATUS_CONFIDENCE);
        }

        Intent::message(IntentKind::AskQuestion, normalized, ASK_QUESTION_CONFIDENCE)
    }
}

fn normalize_text(text: &str) -> String {
    text.trim().to_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_any_word(tokens: &[String], words: &[&str]) -> bool {
    tokens.iter().any(|token| words.contains(&token.as_str()))
}

fn requests_human(tokens: &[String]) -> bool {
    if contains_any_word(tokens, HUMAN_WORDS) || contains_any_word(tokens, FRUSTRATION_WORDS) {
        return true;
    }
    let padded = format!(" {} ", tokens.join(" "));
    FRUSTRATION_PHRASES.iter().any(|phrase| padded.contains(&format!(" {phrase} ")))
}
