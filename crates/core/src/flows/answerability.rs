/// Decides whether a follow-up question stays with the assistant.
pub trait AnswerabilityPolicy: Send + Sync {
    fn is_answerable(&self, question: &str) -> bool;
}

pub const DEFAULT_MAX_WORDS: usize = 20;

const DEFAULT_TOPICS: &[&str] = &[
    "status",
    "prazo",
    "previsão",
    "previsao",
    "peça",
    "peças",
    "peca",
    "pecas",
    "valor",
    "preço",
    "preco",
    "pagamento",
    "garantia",
    "tempo",
    "finalizado",
    "concluído",
    "concluido",
    "loja",
    "deadline",
    "forecast",
    "parts",
    "price",
    "payment",
    "warranty",
    "time",
    "completed",
    "store",
];

/// Keyword hit, or a short enough question without one.
#[derive(Clone, Debug)]
pub struct KeywordAnswerability {
    topics: Vec<String>,
    max_words: usize,
}

impl Default for KeywordAnswerability {
    fn default() -> Self {
        Self {
            topics: DEFAULT_TOPICS.iter().map(|topic| (*topic).to_string()).collect(),
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

impl KeywordAnswerability {
    pub fn new(topics: impl IntoIterator<Item = String>, max_words: usize) -> Self {
        Self {
            topics: topics.into_iter().map(|topic| topic.to_lowercase()).collect(),
            max_words,
        }
    }
}

impl AnswerabilityPolicy for KeywordAnswerability {
    fn is_answerable(&self, question: &str) -> bool {
        let lowered = question.to_lowercase();
        if self.topics.iter().any(|topic| lowered.contains(topic.as_str())) {
            return true;
        }
        lowered.split_whitespace().count() <= self.max_words
    }
}

#[cfg(test)]
mod tests {
    use super::{AnswerabilityPolicy, KeywordAnswerability};

    #[test]
    fn keyword_hit_is_answerable_regardless_of_length() {
        let policy = KeywordAnswerability::default();
        let long = format!("{} qual a garantia", "palavra ".repeat(40));
        assert!(policy.is_answerable(&long));
    }

    #[test]
    fn short_question_without_keyword_is_answerable() {
        let policy = KeywordAnswerability::default();
        assert!(policy.is_answerable("vocês trabalham aos sábados?"));
    }

    #[test]
    fn word_limit_is_inclusive() {
        let policy = KeywordAnswerability::default();
        let twenty = vec!["carro"; 20].join(" ");
        let twenty_one = vec!["carro"; 21].join(" ");

        assert!(policy.is_answerable(&twenty));
        assert!(!policy.is_answerable(&twenty_one));
    }

    #[test]
    fn custom_topics_are_matched_case_insensitively() {
        let policy = KeywordAnswerability::new(vec!["Sensor".to_string()], 2);
        assert!(policy.is_answerable("o SENSOR de chuva foi recalibrado depois da troca"));
        assert!(!policy.is_answerable("uma pergunta bem longa"));
    }
}
