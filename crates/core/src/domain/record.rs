use serde::{Deserialize, Serialize};

/// Customer service order as returned by the status backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub order_id: String,
    pub status: String,
    pub service_type: String,
    pub vehicle: Vehicle,
    /// Preformatted greeting produced upstream; used verbatim when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub model: String,
    pub plate: String,
    pub year: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    Complete,
    InProgress,
    Scheduled,
    Other,
}

impl ServiceRecord {
    pub fn status_tone(&self) -> StatusTone {
        StatusTone::from_status(&self.status)
    }
}

impl StatusTone {
    pub fn from_status(status: &str) -> Self {
        let lowered = status.to_lowercase();
        let contains_any = |needles: &[&str]| needles.iter().any(|needle| lowered.contains(needle));

        if contains_any(&["concluído", "concluido", "finalizado", "complete"]) {
            Self::Complete
        } else if contains_any(&["andamento", "execução", "execucao", "processamento", "progress"])
        {
            Self::InProgress
        } else if contains_any(&["agendado", "programado", "scheduled"]) {
            Self::Scheduled
        } else {
            Self::Other
        }
    }
}
