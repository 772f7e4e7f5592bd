use tera::{Context, Tera};
use thiserror::Error;
use tracing::warn;

use glassdesk_core::domain::record::{ServiceRecord, StatusTone};
use glassdesk_core::domain::session::{Channel, GREETING};
use glassdesk_core::identifier::EntityType;

/// Used when a template fails to render.
pub const PLAIN_FALLBACK: &str = "Desculpe, não consegui entender completamente sua solicitação. \
Como posso te ajudar hoje?";

#[derive(Debug, Error)]
pub enum FormatterError {
    #[error("reply template error: {0}")]
    Template(#[from] tera::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reply {
    Status,
    NotFound,
    AskForIdentifier,
    Escalation,
    Forwarded,
}

impl Reply {
    fn template(self, channel: Channel) -> &'static str {
        match (self, channel) {
            (Self::Status, Channel::Web) => "web/status.html",
            (Self::Status, Channel::Whatsapp) => "whatsapp/status.txt",
            (Self::NotFound, Channel::Web) => "web/not_found.html",
            (Self::NotFound, Channel::Whatsapp) => "whatsapp/not_found.txt",
            (Self::AskForIdentifier, Channel::Web) => "web/ask_for_identifier.html",
            (Self::AskForIdentifier, Channel::Whatsapp) => "whatsapp/ask_for_identifier.txt",
            (Self::Escalation, Channel::Web) => "web/escalation.html",
            (Self::Escalation, Channel::Whatsapp) => "whatsapp/escalation.txt",
            (Self::Forwarded, Channel::Web) => "web/forwarded.html",
            (Self::Forwarded, Channel::Whatsapp) => "whatsapp/forwarded.txt",
        }
    }
}

/// Renders every customer-facing reply. Web templates are HTML-escaped and
/// carry a status tag; WhatsApp templates use `*bold*` markup.
#[derive(Clone, Debug)]
pub struct ResponseFormatter {
    tera: Tera,
}

impl ResponseFormatter {
    pub fn new() -> Result<Self, FormatterError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                "common/identifiers.txt",
                include_str!("../../../templates/replies/common/identifiers.txt.tera"),
            ),
            (
                "common/need_identification.txt",
                include_str!("../../../templates/replies/common/need_identification.txt.tera"),
            ),
            (
                "common/fallback.txt",
                include_str!("../../../templates/replies/common/fallback.txt.tera"),
            ),
            ("web/status.html", include_str!("../../../templates/replies/web/status.html.tera")),
            (
                "web/not_found.html",
                include_str!("../../../templates/replies/web/not_found.html.tera"),
            ),
            (
                "web/ask_for_identifier.html",
                include_str!("../../../templates/replies/web/ask_for_identifier.html.tera"),
            ),
            (
                "web/escalation.html",
                include_str!("../../../templates/replies/web/escalation.html.tera"),
            ),
            (
                "web/forwarded.html",
                include_str!("../../../templates/replies/web/forwarded.html.tera"),
            ),
            (
                "whatsapp/status.txt",
                include_str!("../../../templates/replies/whatsapp/status.txt.tera"),
            ),
            (
                "whatsapp/not_found.txt",
                include_str!("../../../templates/replies/whatsapp/not_found.txt.tera"),
            ),
            (
                "whatsapp/ask_for_identifier.txt",
                include_str!("../../../templates/replies/whatsapp/ask_for_identifier.txt.tera"),
            ),
            (
                "whatsapp/escalation.txt",
                include_str!("../../../templates/replies/whatsapp/escalation.txt.tera"),
            ),
            (
                "whatsapp/forwarded.txt",
                include_str!("../../../templates/replies/whatsapp/forwarded.txt.tera"),
            ),
        ])?;
        Ok(Self { tera })
    }

    /// Lookup success. A summary supplied by the backend wins over the template.
    pub fn status(&self, record: &ServiceRecord, channel: Channel) -> String {
        if let Some(summary) = record.summary.as_deref().filter(|text| !text.trim().is_empty()) {
            return summary.to_string();
        }

        let mut context = Context::new();
        context.insert("name", &record.name);
        context.insert("status", &record.status);
        context.insert("tone", tone_class(record.status_tone()));
        context.insert("order_id", &record.order_id);
        context.insert("service_type", &record.service_type);
        context.insert("model", &record.vehicle.model);
        context.insert("plate", &record.vehicle.plate);
        self.render(Reply::Status.template(channel), &context)
    }

    pub fn not_found(&self, id_type: EntityType, channel: Channel) -> String {
        let mut context = Context::new();
        context.insert("id_label", id_type.display_name());
        self.render(Reply::NotFound.template(channel), &context)
    }

    pub fn ask_for_identifier(&self, channel: Channel) -> String {
        self.render(Reply::AskForIdentifier.template(channel), &Context::new())
    }

    pub fn need_identification(&self, _channel: Channel) -> String {
        self.render("common/need_identification.txt", &Context::new())
    }

    pub fn escalation(&self, escalation_id: &str, channel: Channel) -> String {
        let mut context = Context::new();
        context.insert("escalation_id", escalation_id);
        self.render(Reply::Escalation.template(channel), &context)
    }

    pub fn forwarded(&self, escalation_id: Option<&str>, channel: Channel) -> String {
        let mut context = Context::new();
        context.insert("escalation_id", &escalation_id);
        self.render(Reply::Forwarded.template(channel), &context)
    }

    pub fn fallback(&self, _channel: Channel) -> String {
        self.render("common/fallback.txt", &Context::new())
    }

    pub fn greeting(&self) -> String {
        GREETING.to_string()
    }

    fn render(&self, template: &str, context: &Context) -> String {
        match self.tera.render(template, context) {
            Ok(text) => text.trim_end().to_string(),
            Err(error) => {
                warn!(
                    event_name = "formatter.render_failed",
                    template,
                    error = %error,
                    "reply template failed to render"
                );
                PLAIN_FALLBACK.to_string()
            }
        }
    }
}

fn tone_class(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Complete => "complete",
        StatusTone::InProgress => "progress",
        StatusTone::Scheduled => "scheduled",
        StatusTone::Other => "other",
    }
}
